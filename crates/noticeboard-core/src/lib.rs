pub mod error;
pub mod hooks;
pub mod host;
pub mod nonce;
pub mod registry;
pub mod sanitize;
pub mod types;
pub mod version;

pub use error::NoticeError;
pub use hooks::{HookBus, NoticeEvent};
pub use host::{
    BackgroundUpdater, BufferRenderer, FixedUpdater, MemoryStore, NoticeRenderer, OptionStore,
    RequestContext, StaticRequest, View,
};
pub use nonce::NonceSigner;
pub use registry::{InitHooks, LifecycleHook, NoticeRegistry, ScheduledRender};
pub use types::*;
