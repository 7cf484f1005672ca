use std::fmt::Debug;

use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::types::{
    Capability as SdkCapability, Parameter, StackStatus as SdkStackStatus,
};
use aws_smithy_types::DateTime;
use trop_core::models::{
    Capability, ParameterDirective, ParameterSet, StackDescription, StackEvent, StackOutput,
    StackRequest, StackStatus, StackSummary,
};

use crate::api::{BoxFuture, ControlPlane};
use crate::error::StackError;

/// `ControlPlane` backed by the AWS CloudFormation API.
#[derive(Debug, Clone)]
pub struct CloudFormation {
    client: Client,
}

impl CloudFormation {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl ControlPlane for CloudFormation {
    fn list_stacks<'a>(
        &'a self,
        filter: &'a [StackStatus],
    ) -> BoxFuture<'a, Result<Vec<StackSummary>, StackError>> {
        Box::pin(async move {
            let filter: Vec<SdkStackStatus> = filter
                .iter()
                .map(|s| SdkStackStatus::from(s.as_str()))
                .collect();
            let mut summaries = Vec::new();
            let mut next_token = None;

            loop {
                let resp = self
                    .client
                    .list_stacks()
                    .set_stack_status_filter(Some(filter.clone()))
                    .set_next_token(next_token)
                    .send()
                    .await
                    .map_err(|e| StackError::aws("ListStacks", &e))?;

                summaries.extend(resp.stack_summaries().iter().map(|s| StackSummary {
                    name: s.stack_name().unwrap_or_default().to_string(),
                    status: status_of(s.stack_status()),
                }));

                next_token = resp.next_token().map(String::from);
                if next_token.is_none() {
                    break;
                }
            }

            tracing::debug!(count = summaries.len(), "listed stacks");
            Ok(summaries)
        })
    }

    fn describe_stack<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<StackDescription, StackError>> {
        Box::pin(async move {
            let resp = self
                .client
                .describe_stacks()
                .stack_name(name)
                .send()
                .await
                .map_err(|e| classify(name, "DescribeStacks", e))?;

            let stack = resp.stacks().first().ok_or_else(|| StackError::NotFound {
                name: name.to_string(),
            })?;

            let parameters: ParameterSet = stack
                .parameters()
                .iter()
                .filter_map(|p| {
                    let key = p.parameter_key()?;
                    Some((key, p.parameter_value().unwrap_or_default()))
                })
                .collect();

            let outputs = stack
                .outputs()
                .iter()
                .map(|o| StackOutput {
                    key: o.output_key().unwrap_or_default().to_string(),
                    description: o.description().map(String::from),
                    value: o.output_value().unwrap_or_default().to_string(),
                })
                .collect();

            Ok(StackDescription {
                name: stack.stack_name().unwrap_or(name).to_string(),
                status: status_of(stack.stack_status()),
                parameters,
                outputs,
            })
        })
    }

    fn list_stack_events<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Vec<StackEvent>, StackError>> {
        Box::pin(async move {
            let mut events = Vec::new();
            let mut next_token = None;

            loop {
                let resp = self
                    .client
                    .describe_stack_events()
                    .stack_name(name)
                    .set_next_token(next_token)
                    .send()
                    .await
                    .map_err(|e| classify(name, "DescribeStackEvents", e))?;

                for event in resp.stack_events() {
                    let (Some(id), Some(timestamp)) = (event.event_id(), event.timestamp()) else {
                        tracing::debug!(stack = %name, "skipping event without id or timestamp");
                        continue;
                    };
                    events.push(StackEvent {
                        id: id.to_string(),
                        timestamp: to_timestamp(timestamp)?,
                        logical_resource_id: event
                            .logical_resource_id()
                            .unwrap_or_default()
                            .to_string(),
                        resource_status: event
                            .resource_status()
                            .map(|s| s.as_str().to_string())
                            .unwrap_or_default(),
                        status_reason: event.resource_status_reason().map(String::from),
                    });
                }

                next_token = resp.next_token().map(String::from);
                if next_token.is_none() {
                    break;
                }
            }

            Ok(events)
        })
    }

    fn create_stack<'a>(
        &'a self,
        request: &'a StackRequest,
    ) -> BoxFuture<'a, Result<(), StackError>> {
        Box::pin(async move {
            let resp = self
                .client
                .create_stack()
                .stack_name(&request.name)
                .template_body(&request.template_body)
                .set_parameters(Some(sdk_parameters(&request.parameters)))
                .set_capabilities(sdk_capabilities(&request.capabilities))
                .send()
                .await
                .map_err(|e| StackError::aws("CreateStack", &e))?;

            tracing::info!(
                stack = %request.name,
                stack_id = resp.stack_id().unwrap_or_default(),
                "stack creation submitted"
            );
            Ok(())
        })
    }

    fn update_stack<'a>(
        &'a self,
        request: &'a StackRequest,
    ) -> BoxFuture<'a, Result<(), StackError>> {
        Box::pin(async move {
            let resp = self
                .client
                .update_stack()
                .stack_name(&request.name)
                .template_body(&request.template_body)
                .set_parameters(Some(sdk_parameters(&request.parameters)))
                .set_capabilities(sdk_capabilities(&request.capabilities))
                .send()
                .await
                .map_err(|e| classify(&request.name, "UpdateStack", e))?;

            tracing::info!(
                stack = %request.name,
                stack_id = resp.stack_id().unwrap_or_default(),
                "stack update submitted"
            );
            Ok(())
        })
    }
}

/// CloudFormation has no dedicated not-found error: a missing stack is a
/// `ValidationError` whose message says the stack "does not exist".
fn classify<E, R>(name: &str, operation: &'static str, err: SdkError<E, R>) -> StackError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: Debug + 'static,
{
    let missing = err.code() == Some("ValidationError")
        && err.message().is_some_and(|m| m.contains("does not exist"));
    if missing {
        tracing::debug!(stack = %name, operation, "stack does not exist");
        return StackError::NotFound {
            name: name.to_string(),
        };
    }
    StackError::aws(operation, &err)
}

fn status_of(status: Option<&SdkStackStatus>) -> StackStatus {
    status
        .map(|s| StackStatus::from(s.as_str()))
        .unwrap_or_else(|| StackStatus::Other(String::new()))
}

fn to_timestamp(dt: &DateTime) -> Result<jiff::Timestamp, StackError> {
    let nanos = i32::try_from(dt.subsec_nanos()).unwrap_or_default();
    Ok(jiff::Timestamp::new(dt.secs(), nanos)?)
}

fn sdk_parameters(directives: &[ParameterDirective]) -> Vec<Parameter> {
    directives
        .iter()
        .map(|d| {
            Parameter::builder()
                .parameter_key(&d.key)
                .set_parameter_value(d.explicit_value().map(String::from))
                .use_previous_value(d.uses_previous())
                .build()
        })
        .collect()
}

fn sdk_capabilities(capabilities: &[Capability]) -> Option<Vec<SdkCapability>> {
    if capabilities.is_empty() {
        return None;
    }
    Some(
        capabilities
            .iter()
            .map(|c| SdkCapability::from(c.as_str()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use aws_sdk_cloudformation::error::ErrorMetadata;
    use aws_sdk_cloudformation::operation::describe_stacks::DescribeStacksError;
    use aws_smithy_runtime_api::http::{Response, StatusCode};
    use aws_smithy_types::body::SdkBody;

    use super::*;

    fn service_error(code: &str, message: &str) -> StackError {
        let meta = ErrorMetadata::builder().code(code).message(message).build();
        let status = StatusCode::try_from(400u16).unwrap();
        let err = SdkError::service_error(
            DescribeStacksError::generic(meta),
            Response::new(status, SdkBody::empty()),
        );
        classify("s", "DescribeStacks", err)
    }

    #[test]
    fn missing_stack_validation_error_is_not_found() {
        let err = service_error("ValidationError", "Stack with id s does not exist");
        assert!(matches!(err, StackError::NotFound { ref name } if name == "s"));
    }

    #[test]
    fn other_service_errors_stay_aws_errors() {
        let err = service_error("Throttling", "Rate exceeded");
        assert!(matches!(
            err,
            StackError::Aws { operation: "DescribeStacks", .. }
        ));

        let err = service_error("ValidationError", "Template format error");
        assert!(matches!(err, StackError::Aws { .. }));
    }

    #[test]
    fn directives_map_to_sdk_parameters() {
        let params = sdk_parameters(&[
            ParameterDirective::explicit("A", "v1"),
            ParameterDirective::use_previous("B"),
        ]);

        assert_eq!(params[0].parameter_key(), Some("A"));
        assert_eq!(params[0].parameter_value(), Some("v1"));
        assert_eq!(params[0].use_previous_value(), Some(false));
        assert_eq!(params[1].parameter_key(), Some("B"));
        assert_eq!(params[1].parameter_value(), None);
        assert_eq!(params[1].use_previous_value(), Some(true));
    }

    #[test]
    fn capabilities_omitted_when_empty() {
        assert!(sdk_capabilities(&[]).is_none());
        assert_eq!(
            sdk_capabilities(&[Capability::NamedIam]),
            Some(vec![SdkCapability::CapabilityNamedIam])
        );
    }

    #[test]
    fn smithy_datetime_converts_with_subseconds() {
        let dt = DateTime::from_secs_and_nanos(1_700_000_000, 250_000_000);
        let ts = to_timestamp(&dt).unwrap();
        assert_eq!(ts.as_second(), 1_700_000_000);
        assert_eq!(ts.subsec_nanosecond(), 250_000_000);
    }
}
