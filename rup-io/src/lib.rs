//! Camera parameter files for the undistortion tools

pub mod config;
pub mod error;

pub use config::{
    default_intrinsics, load_intrinsics, load_intrinsics_or_default, parse_camera_file,
    to_yaml_string, write_intrinsics, CameraFile, IntrinsicsSource, LoadedIntrinsics,
    DEFAULT_CAMERA,
};
pub use error::{ConfigError, Result};
