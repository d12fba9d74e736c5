use std::fs;
use std::path::{Path, PathBuf};

use rup_core::{BrownConrady, Intrinsics, IntrinsicsError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ConfigError, Result};

/// On-disk camera parameters, one scalar per field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraFile {
    pub image_width: usize,
    pub image_height: usize,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
}

/// Parameters substituted when no camera file can be read
pub const DEFAULT_CAMERA: CameraFile = CameraFile {
    image_width: 1920,
    image_height: 1080,
    fx: 1738.06409,
    fy: 1736.96128,
    cx: 965.22200,
    cy: 666.61850,
    k1: -0.34592,
    k2: 0.16969,
    p1: -0.00279,
    p2: 0.00235,
};

impl CameraFile {
    pub fn to_intrinsics(&self) -> std::result::Result<Intrinsics, IntrinsicsError> {
        Intrinsics::new(
            self.image_width,
            self.image_height,
            self.fx,
            self.fy,
            self.cx,
            self.cy,
            self.k1,
            self.k2,
            self.p1,
            self.p2,
        )
    }

    pub fn from_intrinsics(intrinsics: &Intrinsics) -> Self {
        let (image_width, image_height) = intrinsics.image_size();
        let (fx, fy) = intrinsics.focal_length();
        let (cx, cy) = intrinsics.principal_point();
        let BrownConrady { k1, k2, p1, p2 } = *intrinsics.distortion();
        Self {
            image_width,
            image_height,
            fx,
            fy,
            cx,
            cy,
            k1,
            k2,
            p1,
            p2,
        }
    }
}

/// Where the intrinsics of a run came from
#[derive(Debug, Clone, PartialEq)]
pub enum IntrinsicsSource {
    File(PathBuf),
    Defaults,
}

#[derive(Debug, Clone)]
pub struct LoadedIntrinsics {
    pub intrinsics: Intrinsics,
    pub source: IntrinsicsSource,
}

pub fn default_intrinsics() -> Result<Intrinsics> {
    Ok(DEFAULT_CAMERA.to_intrinsics()?)
}

/// Parse camera parameters from YAML text.
///
/// OpenCV `FileStorage` output starts with a `%YAML:1.0` line that is not
/// valid YAML 1.2; directive lines are skipped.
pub fn parse_camera_file(text: &str) -> std::result::Result<CameraFile, serde_yaml::Error> {
    let body: String = text
        .lines()
        .filter(|line| !line.trim_start().starts_with('%'))
        .collect::<Vec<_>>()
        .join("\n");
    serde_yaml::from_str(&body)
}

/// Load intrinsics from a camera file
pub fn load_intrinsics<P: AsRef<Path>>(path: P) -> Result<Intrinsics> {
    let path = path.as_ref();

    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let camera = parse_camera_file(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(camera.to_intrinsics()?)
}

/// Load intrinsics, substituting [`DEFAULT_CAMERA`] when the file is missing
/// or unreadable. A readable file with invalid values is still an error.
pub fn load_intrinsics_or_default<P: AsRef<Path>>(path: P) -> Result<LoadedIntrinsics> {
    let path = path.as_ref();

    match load_intrinsics(path) {
        Ok(intrinsics) => {
            info!(path = %path.display(), "Loaded camera parameters");
            Ok(LoadedIntrinsics {
                intrinsics,
                source: IntrinsicsSource::File(path.to_path_buf()),
            })
        }
        Err(err) if err.is_unavailable() => {
            warn!("{err}, using the default parameters");
            Ok(LoadedIntrinsics {
                intrinsics: default_intrinsics()?,
                source: IntrinsicsSource::Defaults,
            })
        }
        Err(err) => Err(err),
    }
}

pub fn to_yaml_string(intrinsics: &Intrinsics) -> Result<String> {
    serde_yaml::to_string(&CameraFile::from_intrinsics(intrinsics)).map_err(ConfigError::Serialize)
}

/// Write intrinsics in the format read by [`load_intrinsics`]
pub fn write_intrinsics<P: AsRef<Path>>(path: P, intrinsics: &Intrinsics) -> Result<()> {
    let path = path.as_ref();
    let yaml = to_yaml_string(intrinsics)?;
    fs::write(path, yaml).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rup-io-{}-{}", std::process::id(), name))
    }

    #[test]
    fn default_camera_is_valid() {
        let camera = default_intrinsics().unwrap();
        assert_eq!(camera.image_size(), (1920, 1080));
        assert_eq!(camera.focal_length(), (1738.06409, 1736.96128));
        assert_eq!(camera.principal_point(), (965.222, 666.6185));
        assert_eq!(
            *camera.distortion(),
            BrownConrady::new(-0.34592, 0.16969, -0.00279, 0.00235)
        );
    }

    #[test]
    fn parses_plain_yaml() {
        let text = "image_width: 640\nimage_height: 480\nfx: 500.0\nfy: 501.5\ncx: 320\ncy: 240\nk1: -0.1\nk2: 0.01\np1: 0.0\np2: 0.0\n";
        let camera = parse_camera_file(text).unwrap();
        assert_eq!(camera.image_width, 640);
        assert_eq!(camera.fy, 501.5);
        assert_eq!(camera.cx, 320.0);
    }

    #[test]
    fn parses_opencv_file_storage() {
        let text = "%YAML:1.0\n---\nimage_width: 1920\nimage_height: 1080\nfx: 1738.06409\nfy: 1736.96128\ncx: 965.22200\ncy: 666.61850\nk1: -0.34592\nk2: 0.16969\np1: -0.00279\np2: 0.00235\n";
        let camera = parse_camera_file(text).unwrap();
        assert_eq!(camera, DEFAULT_CAMERA);
    }

    #[test]
    fn ignores_unknown_fields() {
        let text = "camera_name: front\nimage_width: 640\nimage_height: 480\nfx: 500\nfy: 500\ncx: 320\ncy: 240\nk1: 0\nk2: 0\np1: 0\np2: 0\n";
        assert!(parse_camera_file(text).is_ok());
    }

    #[test]
    fn missing_field_is_parse_error() {
        let text = "image_width: 640\nimage_height: 480\nfx: 500\n";
        assert!(parse_camera_file(text).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = temp_path("does-not-exist.yaml");
        let loaded = load_intrinsics_or_default(&path).unwrap();
        assert_eq!(loaded.source, IntrinsicsSource::Defaults);
        assert_eq!(loaded.intrinsics, default_intrinsics().unwrap());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = temp_path("malformed.yaml");
        fs::write(&path, "fx: [not, a, number\n").unwrap();

        let loaded = load_intrinsics_or_default(&path).unwrap();
        assert_eq!(loaded.source, IntrinsicsSource::Defaults);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn invalid_values_are_rejected() {
        let path = temp_path("zero-focal.yaml");
        fs::write(
            &path,
            "image_width: 640\nimage_height: 480\nfx: 0\nfy: 500\ncx: 320\ncy: 240\nk1: 0\nk2: 0\np1: 0\np2: 0\n",
        )
        .unwrap();

        let err = load_intrinsics_or_default(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(IntrinsicsError::ZeroFocalLength { axis: "fx" })
        ));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn write_then_load() {
        let path = temp_path("written.yaml");
        let camera =
            Intrinsics::new(1280, 720, 900.5, 901.25, 640.0, 360.0, -0.2, 0.05, 0.001, -0.0005)
                .unwrap();

        write_intrinsics(&path, &camera).unwrap();
        let loaded = load_intrinsics_or_default(&path).unwrap();
        assert_eq!(loaded.source, IntrinsicsSource::File(path.clone()));
        assert_eq!(loaded.intrinsics, camera);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn yaml_lists_every_field() {
        let yaml = to_yaml_string(&default_intrinsics().unwrap()).unwrap();
        for key in [
            "image_width",
            "image_height",
            "fx",
            "fy",
            "cx",
            "cy",
            "k1",
            "k2",
            "p1",
            "p2",
        ] {
            assert!(yaml.contains(&format!("{key}:")), "missing {key}");
        }
    }
}
