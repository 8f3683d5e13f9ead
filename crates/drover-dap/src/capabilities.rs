//! Resolved adapter capabilities.

use crate::protocol::Capabilities;

/// Capabilities of the debug adapter, flattened to plain booleans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterCapabilities {
    /// Whether the adapter supports `configurationDone`.
    pub supports_configuration_done_request: bool,
    /// Whether the adapter supports conditional breakpoints.
    pub supports_conditional_breakpoints: bool,
    /// Whether the adapter supports hit-count breakpoints.
    pub supports_hit_conditional_breakpoints: bool,
    /// Whether the adapter supports the `terminate` request.
    pub supports_terminate_request: bool,
    /// Whether the adapter supports exception filter options.
    pub supports_exception_filter_options: bool,
    /// Whether the adapter supports the `exceptionInfo` request.
    pub supports_exception_info_request: bool,
}

impl AdapterCapabilities {
    /// Build from the protocol-level [`Capabilities`] returned by the
    /// adapter in the `initialize` response; absent fields mean
    /// unsupported.
    pub fn from_initialize_response(caps: &Capabilities) -> Self {
        Self {
            supports_configuration_done_request: caps
                .supports_configuration_done_request
                .unwrap_or(false),
            supports_conditional_breakpoints: caps
                .supports_conditional_breakpoints
                .unwrap_or(false),
            supports_hit_conditional_breakpoints: caps
                .supports_hit_conditional_breakpoints
                .unwrap_or(false),
            supports_terminate_request: caps.supports_terminate_request.unwrap_or(false),
            supports_exception_filter_options: caps
                .supports_exception_filter_options
                .unwrap_or(false),
            supports_exception_info_request: caps
                .supports_exception_info_request
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_from_full_response() {
        let caps = Capabilities {
            supports_configuration_done_request: Some(true),
            supports_conditional_breakpoints: Some(true),
            supports_hit_conditional_breakpoints: Some(false),
            supports_terminate_request: Some(true),
            supports_exception_filter_options: Some(true),
            supports_exception_info_request: Some(false),
        };
        let resolved = AdapterCapabilities::from_initialize_response(&caps);
        assert!(resolved.supports_configuration_done_request);
        assert!(resolved.supports_conditional_breakpoints);
        assert!(!resolved.supports_hit_conditional_breakpoints);
        assert!(resolved.supports_terminate_request);
        assert!(resolved.supports_exception_filter_options);
        assert!(!resolved.supports_exception_info_request);
    }

    #[test]
    fn capabilities_from_empty_response() {
        let resolved = AdapterCapabilities::from_initialize_response(&Capabilities::default());
        assert_eq!(resolved, AdapterCapabilities::default());
        assert!(!resolved.supports_configuration_done_request);
    }
}
