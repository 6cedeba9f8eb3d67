pub mod cognito;
pub mod flow;
pub mod linkedin;
pub mod provider;
pub mod session;
pub mod store;
