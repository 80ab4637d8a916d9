//! Network device resolution
//!
//! Device names assigned at boot are not predictable, so declared networks are
//! matched to devices by hardware address read from sysfs.

use crate::error::{NetconvergeError, NetconvergeResult};
use crate::fs::FileSystem;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Hardware address to device name
pub type DeviceMap = HashMap<String, String>;

pub struct DeviceResolver {
    fs: Arc<dyn FileSystem>,
    net_class_dir: PathBuf,
}

impl DeviceResolver {
    pub fn new(fs: Arc<dyn FileSystem>, net_class_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            net_class_dir: net_class_dir.into(),
        }
    }

    pub fn net_class_dir(&self) -> &Path {
        &self.net_class_dir
    }

    /// Scan the device directory and index devices by hardware address
    ///
    /// Built fresh on every call. Duplicate addresses are not detected.
    pub async fn resolve(&self) -> NetconvergeResult<DeviceMap> {
        let devices = self.fs.list_dir(&self.net_class_dir).await
            .map_err(|source| NetconvergeError::DeviceEnumeration {
                path: self.net_class_dir.clone(),
                source,
            })?;

        let mut map = DeviceMap::with_capacity(devices.len());
        for device_path in devices {
            let address_path = device_path.join("address");
            let address = self.fs.read_to_string(&address_path).await
                .map_err(|source| NetconvergeError::DeviceEnumeration {
                    path: address_path.clone(),
                    source,
                })?;

            let name = device_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let address = address.trim().to_string();
            debug!("Found device {} with hardware address {}", name, address);
            map.insert(address, name);
        }

        Ok(map)
    }
}
