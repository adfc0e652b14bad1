pub mod aop;
pub mod bean;
pub mod condition;
pub mod context;
pub mod environment;
pub mod error;
pub mod event;
pub mod injection;
pub mod provider;
pub mod qualifier;
pub mod registry;
pub mod resolution;
pub mod scope;

#[cfg(feature = "derive")]
pub use beanwire_derive::Bean;
