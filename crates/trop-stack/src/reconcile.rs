use indexmap::IndexMap;
use trop_core::models::{
    Capability, ParameterDirective, ParameterSet, StackRequest, StackStatus,
};
use trop_core::{Layout, StackTemplate};

use crate::api::ControlPlane;
use crate::error::StackError;

/// Compute the parameter directives for a create/update request.
///
/// Declared keys come first in declaration order, followed by supplied keys
/// the template does not declare. For each key:
/// - supplied: explicit value (the last supplied entry for a key wins)
/// - not supplied, present in `previous`: reuse the previous value
/// - not supplied, absent from `previous`: omitted
pub fn reconcile<D, S, K, V>(declared: D, supplied: S, previous: &ParameterSet) -> Vec<ParameterDirective>
where
    D: IntoIterator,
    D::Item: Into<String>,
    S: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut merged: IndexMap<String, Option<String>> =
        declared.into_iter().map(|key| (key.into(), None)).collect();
    for (key, value) in supplied {
        merged.insert(key.into(), Some(value.into()));
    }

    merged
        .into_iter()
        .filter_map(|(key, value)| match value {
            Some(value) => Some(ParameterDirective::explicit(key, value)),
            None if previous.contains_key(&key) => Some(ParameterDirective::use_previous(key)),
            None => None,
        })
        .collect()
}

/// Parameters persisted on the stack, or `None` if the stack does not
/// exist or has been deleted.
pub async fn stack_parameters(
    api: &dyn ControlPlane,
    name: &str,
) -> Result<Option<ParameterSet>, StackError> {
    match api.describe_stack(name).await {
        Ok(stack) if stack.status == StackStatus::DeleteComplete => Ok(None),
        Ok(stack) => Ok(Some(stack.parameters)),
        Err(StackError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Previous parameter values for reconciliation. A missing or deleted
/// stack has none.
pub async fn previous_parameters(
    api: &dyn ControlPlane,
    name: &str,
) -> Result<ParameterSet, StackError> {
    Ok(stack_parameters(api, name).await?.unwrap_or_default())
}

/// Build the full create/update request for `name` from a template and the
/// caller's parameters.
pub async fn build_request(
    api: &dyn ControlPlane,
    template: &dyn StackTemplate,
    name: &str,
    supplied: &[(String, String)],
    capability: Option<Capability>,
) -> Result<StackRequest, StackError> {
    let previous = previous_parameters(api, name).await?;
    let parameters = reconcile(
        template.parameter_names(),
        supplied.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        &previous,
    );

    tracing::debug!(
        stack = %name,
        previous = previous.len(),
        directives = parameters.len(),
        "reconciled parameters"
    );

    Ok(StackRequest {
        name: name.to_string(),
        template_body: template.to_document(Layout::Compact)?,
        parameters,
        capabilities: capability.into_iter().collect(),
    })
}
