//! Config validation
//!
//! Rules:
//! - `validator` derive rules (zoom bounds, capacities >= 1, non-empty names)
//! - route ids unique, sink names unique
//! - min_zoom <= default_zoom / focus_zoom <= max_zoom
//! - waypoint and inline snapshot coordinates in range
//! - stream rates > 0
//! - file sinks carry a `path` param

use std::collections::HashSet;

use ::validator::{Validate, ValidationErrors, ValidationErrorsKind};
use contracts::{ContractError, DashboardConfig, SinkType, StreamSource};

/// Validate a DashboardConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &DashboardConfig) -> Result<(), ContractError> {
    validate_derived(config)?;
    validate_zoom_order(config)?;
    validate_route_ids(config)?;
    validate_waypoints(config)?;
    validate_snapshot(config)?;
    validate_stream_source(config)?;
    validate_sinks(config)?;
    Ok(())
}

/// Run the derive rules and report the first violation with its path
fn validate_derived(config: &DashboardConfig) -> Result<(), ContractError> {
    match config.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let (field, message) = first_violation(&errors, "")
                .unwrap_or_else(|| ("config".to_string(), errors.to_string()));
            Err(ContractError::config_validation(field, message))
        }
    }
}

fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(error) = list.first() {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.to_string());
                    return Some((path, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_violation(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_violation(inner, &format!("{path}[{idx}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

fn validate_zoom_order(config: &DashboardConfig) -> Result<(), ContractError> {
    let map = &config.map;
    if map.min_zoom > map.max_zoom {
        return Err(ContractError::config_validation(
            "map.min_zoom / map.max_zoom",
            format!(
                "min_zoom ({}) must be <= max_zoom ({})",
                map.min_zoom, map.max_zoom
            ),
        ));
    }
    for (field, zoom) in [("map.default_zoom", map.default_zoom), ("map.focus_zoom", map.focus_zoom)] {
        if zoom < map.min_zoom || zoom > map.max_zoom {
            return Err(ContractError::config_validation(
                field,
                format!(
                    "zoom {zoom} outside [{}, {}]",
                    map.min_zoom, map.max_zoom
                ),
            ));
        }
    }
    map.default_center
        .validate()
        .map_err(|e| ContractError::config_validation("map.default_center", e.to_string()))
}

fn validate_route_ids(config: &DashboardConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for route in &config.routes {
        if !seen.insert(route.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("routes[id={}]", route.id),
                "duplicate route id",
            ));
        }
    }
    Ok(())
}

fn validate_waypoints(config: &DashboardConfig) -> Result<(), ContractError> {
    for route in &config.routes {
        for (idx, waypoint) in route.waypoints.iter().enumerate() {
            waypoint.position().validate().map_err(|e| {
                ContractError::config_validation(
                    format!("routes[{}].waypoints[{idx}]", route.id),
                    e.to_string(),
                )
            })?;
        }
    }
    Ok(())
}

fn validate_snapshot(config: &DashboardConfig) -> Result<(), ContractError> {
    for entity in &config.snapshot.entities {
        entity.validate().map_err(|e| {
            ContractError::config_validation(
                format!("snapshot.entities[id={}]", entity.id),
                e.to_string(),
            )
        })?;
    }
    Ok(())
}

fn validate_stream_source(config: &DashboardConfig) -> Result<(), ContractError> {
    match &config.stream.source {
        StreamSource::Replay {
            rate_hz: Some(rate), ..
        } if !(rate.is_finite() && *rate > 0.0) => Err(ContractError::config_validation(
            "stream.source.rate_hz",
            format!("rate_hz must be > 0, got {rate}"),
        )),
        StreamSource::Simulated { rate_hz, step_deg, .. } => {
            if !(rate_hz.is_finite() && *rate_hz > 0.0) {
                return Err(ContractError::config_validation(
                    "stream.source.rate_hz",
                    format!("rate_hz must be > 0, got {rate_hz}"),
                ));
            }
            if !(step_deg.is_finite() && *step_deg >= 0.0) {
                return Err(ContractError::config_validation(
                    "stream.source.step_deg",
                    format!("step_deg must be >= 0, got {step_deg}"),
                ));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn validate_sinks(config: &DashboardConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in config.sinks.iter().enumerate() {
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                format!("duplicate sink name '{}'", sink.name),
            ));
        }
        if sink.sink_type == SinkType::File && !sink.params.contains_key("path") {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].params.path"),
                "file sink requires a 'path' param",
            ));
        }
    }
    Ok(())
}
