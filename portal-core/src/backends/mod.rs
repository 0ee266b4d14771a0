pub mod http;

#[cfg(any(test, feature = "backend_mock"))]
pub mod mock;
