//! Static catalog of known firmwares, keyed on the identity triple carried
//! by the leading header.  A value, not a registry: nothing is pluggable.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareEntry {
    pub device_id: &'static str,
    pub device_version: &'static str,
    pub dvr: &'static str,
    pub name: &'static str,
}

#[rustfmt::skip]
pub const CATALOG: &[FirmwareEntry] = &[
    FirmwareEntry { device_id: "C59Y1", device_version: "M1INT", dvr: "Ver1.29", name: "YI M1 2.0-int" },
    FirmwareEntry { device_id: "C59Y1", device_version: "M1INT", dvr: "Ver1.33", name: "YI M1 2.5-int" },
    FirmwareEntry { device_id: "C59Y1", device_version: "M1INT", dvr: "Ver1.35", name: "YI M1 2.7-int" },
    FirmwareEntry { device_id: "C59Y1", device_version: "M1INT", dvr: "Ver1.37", name: "YI M1 3.0-int" },
    FirmwareEntry { device_id: "C59Y1", device_version: "M1INT", dvr: "Ver1.39", name: "YI M1 3.2-int" },
    FirmwareEntry { device_id: "C59Y1", device_version: "M1CN",  dvr: "Ver1.29", name: "YI M1 2.0-cn" },
    FirmwareEntry { device_id: "C59Y1", device_version: "M1CN",  dvr: "Ver1.33", name: "YI M1 2.5-cn" },
    FirmwareEntry { device_id: "C59Y1", device_version: "M1CN",  dvr: "Ver1.35", name: "YI M1 2.7-cn" },
    FirmwareEntry { device_id: "C59Y1", device_version: "M1CN",  dvr: "Ver1.37", name: "YI M1 3.0-cn" },
    FirmwareEntry { device_id: "C59Y1", device_version: "M1CN",  dvr: "Ver1.39", name: "YI M1 3.2-cn" },
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogMiss {
    #[error("unknown device id `{0}`")]
    UnknownDevice(String),
    #[error("unknown firmware region `{1}` for device `{0}`")]
    UnknownDeviceVersion(String, String),
    #[error("unknown internal version `{2}` for {0} {1}")]
    UnknownDvr(String, String, String),
}

/// Resolve an identity triple, reporting which level missed.
pub fn lookup(
    device_id: &str,
    device_version: &str,
    dvr: &str,
) -> Result<&'static FirmwareEntry, CatalogMiss> {
    if !CATALOG.iter().any(|e| e.device_id == device_id) {
        return Err(CatalogMiss::UnknownDevice(device_id.to_owned()));
    }
    if !CATALOG
        .iter()
        .any(|e| e.device_id == device_id && e.device_version == device_version)
    {
        return Err(CatalogMiss::UnknownDeviceVersion(
            device_id.to_owned(),
            device_version.to_owned(),
        ));
    }
    CATALOG
        .iter()
        .find(|e| {
            e.device_id == device_id && e.device_version == device_version && e.dvr == dvr
        })
        .ok_or_else(|| {
            CatalogMiss::UnknownDvr(
                device_id.to_owned(),
                device_version.to_owned(),
                dvr.to_owned(),
            )
        })
}
