pub mod service;

pub use service::LinkCleanupService;
