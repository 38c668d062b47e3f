//! Python module entry point
use crate::converters::{diff_to_pylist, py_sequence_to_items};
use crate::diff_engine::{difference, try_difference};
use crate::types::ItemStatus;
use pyo3::prelude::*;
use pyo3::types::PyList;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// `difference(new, old=None, strict=False)`: classify every item of `new`
/// against `old`. Items are JSON-serializable objects carrying a `"key"`.
#[pyfunction]
#[pyo3(name = "difference", signature = (new, old=None, strict=false))]
fn py_difference<'py>(
    py: Python<'py>,
    new: &Bound<'py, PyAny>,
    old: Option<&Bound<'py, PyAny>>,
    strict: bool,
) -> PyResult<Bound<'py, PyList>> {
    let new_items = py_sequence_to_items(py, new)?;
    let old_items = old.map(|o| py_sequence_to_items(py, o)).transpose()?;
    let diff = if strict {
        try_difference(&new_items, old_items.as_deref())?
    } else {
        difference(&new_items, old_items.as_deref())
    };
    diff_to_pylist(py, &diff)
}

/// Remembers the last sequence seen per context, so callers only pass the
/// new sequence.
#[pyclass]
pub struct Reconciler {
    contexts: Arc<Mutex<HashMap<String, Vec<serde_json::Value>>>>,
}

#[pymethods]
impl Reconciler {
    #[new]
    fn new() -> Self {
        log::info!("Reconciler initialized");
        Reconciler { contexts: Arc::new(Mutex::new(HashMap::new())) }
    }

    #[pyo3(signature = (new, context="main".to_string()))]
    fn reconcile<'py>(&self, py: Python<'py>, new: &Bound<'py, PyAny>, context: String) -> PyResult<Bound<'py, PyList>> {
        let new_items = py_sequence_to_items(py, new)?;
        let mut contexts = self
            .contexts
            .lock()
            .map_err(|e| pyo3::exceptions::PyRuntimeError::new_err(e.to_string()))?;
        let diff = difference(&new_items, contexts.get(&context).map(Vec::as_slice));
        contexts.insert(context, new_items);
        diff_to_pylist(py, &diff)
    }

    fn clear_context(&self, context: String) -> PyResult<()> {
        let mut contexts = self
            .contexts
            .lock()
            .map_err(|e| pyo3::exceptions::PyRuntimeError::new_err(e.to_string()))?;
        contexts.remove(&context);
        Ok(())
    }

    fn clear_all_contexts(&self) -> PyResult<()> {
        let mut contexts = self
            .contexts
            .lock()
            .map_err(|e| pyo3::exceptions::PyRuntimeError::new_err(e.to_string()))?;
        contexts.clear();
        Ok(())
    }
}

#[pymodule]
fn list_reconciler(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_difference, m)?)?;
    m.add_class::<Reconciler>()?;

    // Status names as they appear in the returned dicts
    for status in [ItemStatus::Unchanged, ItemStatus::Moved, ItemStatus::Created, ItemStatus::Deleted] {
        let name = status.to_string();
        m.add(name.to_uppercase().as_str(), name)?;
    }
    Ok(())
}
