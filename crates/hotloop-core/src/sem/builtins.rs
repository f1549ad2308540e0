//! Registry of the Arc engine's scripting API
//!
//! The analyzer does not load engine assemblies; the subset of the API
//! the rules care about is declared here as a static table: which types
//! exist, which namespace they live in, and which members allocate or
//! scan per call.

use std::collections::HashMap;

pub const ARC_NAMESPACE: &str = "Arc";
pub const EDITOR_NAMESPACE: &str = "Arc.Editor";
pub const STD_NAMESPACE: &str = "Std";

/// Base class every frame-callback receiver derives from.
pub const BEHAVIOUR_BASE: &str = "Behaviour";

/// Heap-allocating container types, by bare name.
pub const CONTAINER_TYPES: &[&str] = &["List", "Dict", "Set", "Queue", "Stack"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Property,
    Method,
}

#[derive(Debug, Clone)]
pub struct BuiltinMember {
    pub owner: &'static str,
    pub namespace: &'static str,
    pub name: &'static str,
    pub kind: MemberKind,
    pub result_type: &'static str,
    /// Member materializes a fresh array on every access.
    pub returns_array: bool,
}

impl BuiltinMember {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.namespace, self.owner, self.name)
    }

    pub fn is_editor_only(&self) -> bool {
        self.namespace == EDITOR_NAMESPACE
    }
}

#[derive(Debug)]
pub struct BuiltinType {
    pub name: &'static str,
    pub namespace: &'static str,
    members: Vec<BuiltinMember>,
}

impl BuiltinType {
    pub fn member(&self, name: &str) -> Option<&BuiltinMember> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn members(&self) -> &[BuiltinMember] {
        &self.members
    }
}

#[derive(Debug)]
pub struct BuiltinRegistry {
    types: HashMap<&'static str, BuiltinType>,
}

impl BuiltinRegistry {
    /// The stock Arc API table.
    pub fn arc_engine() -> Self {
        let mut registry = Self {
            types: HashMap::new(),
        };

        registry.add_type(
            ARC_NAMESPACE,
            "Camera",
            &[
                ("main", MemberKind::Property, "Camera", false),
                ("transform", MemberKind::Property, "Transform", false),
                ("Render", MemberKind::Method, "void", false),
            ],
        );
        registry.add_type(
            ARC_NAMESPACE,
            "Scene",
            &[
                ("Find", MemberKind::Method, "Object", false),
                ("FindWithTag", MemberKind::Method, "Object", false),
                ("FindObjectsOfType", MemberKind::Method, "Object", true),
                ("objects", MemberKind::Property, "Object", true),
            ],
        );
        registry.add_type(
            ARC_NAMESPACE,
            "Behaviour",
            &[
                ("StartCoroutine", MemberKind::Method, "Coroutine", false),
                ("StopCoroutine", MemberKind::Method, "void", false),
                ("GetComponent", MemberKind::Method, "Object", false),
                ("transform", MemberKind::Property, "Transform", false),
            ],
        );
        registry.add_type(
            ARC_NAMESPACE,
            "Transform",
            &[("position", MemberKind::Property, "Vector3", false)],
        );
        registry.add_type(
            ARC_NAMESPACE,
            "Time",
            &[
                ("delta", MemberKind::Property, "float", false),
                ("now", MemberKind::Property, "float", false),
            ],
        );
        registry.add_type(
            ARC_NAMESPACE,
            "Input",
            &[
                ("touches", MemberKind::Property, "Touch", true),
                ("pressed", MemberKind::Method, "bool", false),
            ],
        );
        registry.add_type(
            ARC_NAMESPACE,
            "Mesh",
            &[
                ("vertices", MemberKind::Property, "Vector3", true),
                ("normals", MemberKind::Property, "Vector3", true),
                ("Recalculate", MemberKind::Method, "void", false),
            ],
        );
        registry.add_type(
            ARC_NAMESPACE,
            "Debug",
            &[
                ("Log", MemberKind::Method, "void", false),
                ("Warn", MemberKind::Method, "void", false),
            ],
        );
        registry.add_type(
            ARC_NAMESPACE,
            "Object",
            &[("Destroy", MemberKind::Method, "void", false)],
        );
        registry.add_type(
            ARC_NAMESPACE,
            "Coroutine",
            &[("running", MemberKind::Property, "bool", false)],
        );

        registry.add_type(
            EDITOR_NAMESPACE,
            "Inspector",
            &[
                ("Repaint", MemberKind::Method, "void", false),
                ("selected", MemberKind::Property, "Object", false),
            ],
        );
        registry.add_type(
            EDITOR_NAMESPACE,
            "Gizmos",
            &[("Draw", MemberKind::Method, "void", false)],
        );

        registry
    }

    fn add_type(
        &mut self,
        namespace: &'static str,
        name: &'static str,
        members: &[(&'static str, MemberKind, &'static str, bool)],
    ) {
        let members = members
            .iter()
            .map(|&(m_name, kind, result_type, returns_array)| BuiltinMember {
                owner: name,
                namespace,
                name: m_name,
                kind,
                result_type,
                returns_array,
            })
            .collect();
        self.types.insert(
            name,
            BuiltinType {
                name,
                namespace,
                members,
            },
        );
    }

    /// Lookup by bare type name (`Camera`).
    pub fn type_named(&self, name: &str) -> Option<&BuiltinType> {
        self.types.get(name)
    }

    /// Lookup by bare name restricted to one namespace; `Arc.Editor.Gizmos`
    /// resolves through here with namespace `Arc.Editor`.
    pub fn type_in_namespace(&self, namespace: &str, name: &str) -> Option<&BuiltinType> {
        self.types.get(name).filter(|t| t.namespace == namespace)
    }

    pub fn is_namespace(&self, path: &str) -> bool {
        path == ARC_NAMESPACE || path == EDITOR_NAMESPACE || path == STD_NAMESPACE
    }

    /// `new List()` / `new Std.List()` / `new Std.Collections.List()` all
    /// count as container construction.
    pub fn is_container_type(&self, type_name: &str) -> bool {
        let bare = type_name.rsplit('.').next().unwrap_or(type_name);
        CONTAINER_TYPES.contains(&bare)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_main_is_a_property() {
        let registry = BuiltinRegistry::arc_engine();
        let member = registry.type_named("Camera").unwrap().member("main").unwrap();

        assert_eq!(member.kind, MemberKind::Property);
        assert_eq!(member.result_type, "Camera");
        assert_eq!(member.qualified_name(), "Arc.Camera.main");
        assert!(!member.is_editor_only());
    }

    #[test]
    fn editor_types_are_flagged() {
        let registry = BuiltinRegistry::arc_engine();
        let member = registry
            .type_named("Inspector")
            .unwrap()
            .member("Repaint")
            .unwrap();

        assert!(member.is_editor_only());
        assert!(registry.type_in_namespace(EDITOR_NAMESPACE, "Inspector").is_some());
        assert!(registry.type_in_namespace(ARC_NAMESPACE, "Inspector").is_none());
    }

    #[test]
    fn array_members_are_marked() {
        let registry = BuiltinRegistry::arc_engine();
        assert!(registry.type_named("Mesh").unwrap().member("vertices").unwrap().returns_array);
        assert!(!registry.type_named("Time").unwrap().member("delta").unwrap().returns_array);
    }

    #[test]
    fn container_names_match_qualified_or_bare() {
        let registry = BuiltinRegistry::arc_engine();
        assert!(registry.is_container_type("List"));
        assert!(registry.is_container_type("Std.List"));
        assert!(registry.is_container_type("Std.Collections.Queue"));
        assert!(!registry.is_container_type("Mesh"));
    }
}
