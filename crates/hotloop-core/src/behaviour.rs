//! Entry-point enumeration for frame-path rules
//!
//! Rules that reason about the frame loop start from the frame callbacks of
//! behaviour classes. [`BehaviourInfo`] answers whether a class derives from
//! the engine's `Behaviour` base and yields its frame-callback methods.

use crate::sem::{ClassSymId, MethodSymbol, SemanticIndex};

/// Engine callbacks invoked every frame. Fixed set, not configurable.
pub const FRAME_CALLBACKS: &[&str] = &["Update", "FixedUpdate", "LateUpdate", "OnGui"];

pub fn is_frame_callback(name: &str) -> bool {
    FRAME_CALLBACKS.contains(&name)
}

pub struct BehaviourInfo<'a> {
    index: &'a SemanticIndex,
    class: ClassSymId,
}

impl<'a> BehaviourInfo<'a> {
    pub fn new(index: &'a SemanticIndex, class: ClassSymId) -> Self {
        Self { index, class }
    }

    /// Whether the class derives, directly or through user bases, from the
    /// engine `Behaviour` class. Cyclic base chains terminate as false.
    pub fn is_behaviour(&self) -> bool {
        let mut visited = vec![self.class];
        let mut current = self.class;
        loop {
            let Some(base) = self.index.class(current).base.as_deref() else {
                return false;
            };
            if matches!(base, "Behaviour" | "Arc.Behaviour") {
                return true;
            }
            let Some(parent) = self.index.class_named(base) else {
                return false;
            };
            if visited.contains(&parent) {
                return false;
            }
            visited.push(parent);
            current = parent;
        }
    }

    /// Calls `f` for each frame-callback method of the class. Does nothing
    /// when the class is not a behaviour.
    pub fn for_each_frame_method(&self, mut f: impl FnMut(&'a MethodSymbol)) {
        if !self.is_behaviour() {
            return;
        }
        for &method_id in &self.index.class(self.class).methods {
            let method = self.index.method(method_id);
            if is_frame_callback(&method.name) {
                f(method);
            }
        }
    }
}
