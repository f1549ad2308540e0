//! Performance rules for the frame loop

pub mod cache_array_api;
pub mod camera_main;
pub mod closure_capture;
pub mod collection_alloc;
pub mod empty_callback;
pub mod scene_find;
pub mod spawn_coroutine;

pub use cache_array_api::CacheArrayApi;
pub use camera_main::CameraMainInFrameLoop;
pub use closure_capture::ClosureCaptureInFrameLoop;
pub use collection_alloc::CollectionAllocInFrameLoop;
pub use empty_callback::EmptyFrameCallback;
pub use scene_find::SceneFindInFrameLoop;
pub use spawn_coroutine::CoroutineStartInFrameLoop;
