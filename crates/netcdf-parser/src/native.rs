//! Thin helpers over the native netcdf library.
//!
//! The netcdf crate wraps libnetcdf/HDF5. HDF5 prints diagnostics for
//! attribute lookups that fail even when the caller handles the failure, so
//! attributes are checked for existence before they are read.

use std::sync::Once;

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// Only needs to be called once per process, but is safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
pub(crate) fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Helper to get f64 attribute.
pub(crate) fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

/// Helper to get f32 attribute.
pub(crate) fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
    get_f64_attr(var, name).map(|v| v as f32)
}

/// Helper to get a text attribute.
pub(crate) fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        netcdf::AttributeValue::Strs(mut s) if !s.is_empty() => Some(s.remove(0)),
        _ => None,
    }
}

/// Packing attributes of a CF variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Packing {
    pub scale_factor: f32,
    pub add_offset: f32,
    pub fill_value: Option<f32>,
    pub missing_value: Option<f32>,
}

impl Packing {
    pub fn from_variable(var: &netcdf::Variable) -> Self {
        Self {
            scale_factor: get_f32_attr(var, "scale_factor").unwrap_or(1.0),
            add_offset: get_f32_attr(var, "add_offset").unwrap_or(0.0),
            fill_value: get_f32_attr(var, "_FillValue"),
            missing_value: get_f32_attr(var, "missing_value"),
        }
    }

    /// Apply scale and offset to a raw value; fill and missing markers become `NaN`.
    #[inline]
    pub fn unpack(&self, raw: f32) -> f32 {
        if self.fill_value == Some(raw) || self.missing_value == Some(raw) || raw.is_nan() {
            f32::NAN
        } else {
            raw * self.scale_factor + self.add_offset
        }
    }
}
