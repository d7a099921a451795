pub mod error;
pub mod facade;
pub mod registry;
pub mod rpc;

pub use error::CoreError;
pub use facade::MarketMaker;
pub use registry::{Registry, RegistryBuilder};
pub use rpc::{MmProxy, ProxyConfig, RpcResponse};
