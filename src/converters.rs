//! Conversion between Python objects and JSON, routed through Python's own
//! `json` module so anything it accepts is accepted here.
use crate::errors::ReconcilerError;
use crate::types::DiffEntry;
use pyo3::prelude::*;
use pyo3::types::{PyList, PyModule};

pub fn python_to_json<'py>(py: Python<'py>, obj: &Bound<'py, PyAny>) -> Result<serde_json::Value, ReconcilerError> {
    let dumped = PyModule::import(py, "json")?.getattr("dumps")?.call1((obj,))?;
    let text: String = dumped.extract()?;
    serde_json::from_str(&text).map_err(|e| ReconcilerError::TypeConversionError {
        expected: "JSON-serializable value".into(),
        actual: e.to_string(),
    })
}

pub fn json_to_python<'py>(py: Python<'py>, text: &str) -> PyResult<Bound<'py, PyAny>> {
    PyModule::import(py, "json")?.getattr("loads")?.call1((text,))
}

/// A Python list (or `None`, read as empty) of items.
pub fn py_sequence_to_items<'py>(
    py: Python<'py>,
    obj: &Bound<'py, PyAny>,
) -> Result<Vec<serde_json::Value>, ReconcilerError> {
    if obj.is_none() {
        return Ok(Vec::new());
    }
    match python_to_json(py, obj)? {
        serde_json::Value::Array(items) => Ok(items),
        other => Err(ReconcilerError::TypeConversionError { expected: "list".into(), actual: other.to_string() }),
    }
}

/// Diff entries as a list of `{"key", "item", "status"}` dicts.
pub fn diff_to_pylist<'py>(py: Python<'py>, diff: &[DiffEntry<serde_json::Value>]) -> PyResult<Bound<'py, PyList>> {
    let text = serde_json::to_string(diff).map_err(ReconcilerError::from)?;
    let list = json_to_python(py, &text)?.cast_into::<PyList>()?;
    Ok(list)
}
