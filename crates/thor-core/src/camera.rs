//! Third-party cameras: render viewpoints independent of any agent

use crate::metadata::{PartialVector3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera validation failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CameraError {
    #[error("fieldOfView must be in (0, 180), got {0}")]
    InvalidFieldOfView(f64),

    #[error("orthographicSize requires an orthographic camera")]
    OrthographicSizeRequiresOrthographic,

    #[error("orthographicSize must be positive, got {0}")]
    InvalidOrthographicSize(f64),

    #[error("no third party camera with id {id}; {count} cameras exist")]
    UnknownCamera { id: usize, count: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThirdPartyCamera {
    pub third_party_camera_id: usize,
    pub position: Vector3,
    pub rotation: Vector3,
    pub field_of_view: f64,
    #[serde(default)]
    pub orthographic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orthographic_size: Option<f64>,
}

impl ThirdPartyCamera {
    fn validate(&self) -> Result<(), CameraError> {
        if !(self.field_of_view > 0.0 && self.field_of_view < 180.0) {
            return Err(CameraError::InvalidFieldOfView(self.field_of_view));
        }
        if let Some(size) = self.orthographic_size {
            if !self.orthographic {
                return Err(CameraError::OrthographicSizeRequiresOrthographic);
            }
            if size <= 0.0 {
                return Err(CameraError::InvalidOrthographicSize(size));
            }
        }
        Ok(())
    }
}

/// Parameters of AddThirdPartyCamera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCamera {
    pub position: Vector3,
    pub rotation: Vector3,
    #[serde(default = "default_fov")]
    pub field_of_view: f64,
    #[serde(default)]
    pub orthographic: bool,
    #[serde(default)]
    pub orthographic_size: Option<f64>,
}

fn default_fov() -> f64 {
    90.0
}

/// Parameters of UpdateThirdPartyCamera; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraUpdate {
    #[serde(default)]
    pub third_party_camera_id: usize,
    #[serde(default)]
    pub position: Option<PartialVector3>,
    #[serde(default)]
    pub rotation: Option<PartialVector3>,
    #[serde(default)]
    pub field_of_view: Option<f64>,
    #[serde(default)]
    pub orthographic: Option<bool>,
    #[serde(default)]
    pub orthographic_size: Option<f64>,
}

/// Ordered set of third-party cameras, addressed by index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraRig {
    cameras: Vec<ThirdPartyCamera>,
}

impl CameraRig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cameras(&self) -> &[ThirdPartyCamera] {
        &self.cameras
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Append a camera; its id is the count before insertion
    pub fn add(&mut self, new: NewCamera) -> Result<&ThirdPartyCamera, CameraError> {
        let camera = ThirdPartyCamera {
            third_party_camera_id: self.cameras.len(),
            position: new.position,
            rotation: new.rotation,
            field_of_view: new.field_of_view,
            orthographic: new.orthographic,
            orthographic_size: new.orthographic_size,
        };
        camera.validate()?;
        self.cameras.push(camera);
        Ok(&self.cameras[self.cameras.len() - 1])
    }

    /// Merge an update into an existing camera
    ///
    /// The merged camera is validated before it replaces the stored one, so
    /// a rejected update leaves the rig untouched.
    pub fn update(&mut self, update: &CameraUpdate) -> Result<&ThirdPartyCamera, CameraError> {
        let id = update.third_party_camera_id;
        let count = self.cameras.len();
        let current = self
            .cameras
            .get(id)
            .ok_or(CameraError::UnknownCamera { id, count })?;

        let mut merged = current.clone();
        if let Some(position) = &update.position {
            merged.position = position.apply(merged.position);
        }
        if let Some(rotation) = &update.rotation {
            merged.rotation = rotation.apply(merged.rotation);
        }
        if let Some(fov) = update.field_of_view {
            merged.field_of_view = fov;
        }
        if let Some(orthographic) = update.orthographic {
            merged.orthographic = orthographic;
            if !orthographic {
                merged.orthographic_size = None;
            }
        }
        if update.orthographic_size.is_some() {
            merged.orthographic_size = update.orthographic_size;
        }
        merged.validate()?;

        self.cameras[id] = merged;
        Ok(&self.cameras[id])
    }
}
