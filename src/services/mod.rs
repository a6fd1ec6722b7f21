pub mod app_config;
pub mod compress;
pub mod email;
pub mod image_gen;
pub mod key_vault;
pub mod resize;
pub mod storage;
