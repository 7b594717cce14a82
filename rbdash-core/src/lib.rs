//! rbdash core library - build-log access and APK verification

pub mod apk;
pub mod config;
pub mod digest;
pub mod log;
pub mod verify;
