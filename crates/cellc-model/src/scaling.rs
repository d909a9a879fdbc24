//! Scaling policies and their projection into the service template.
//!
//! A component scales either on resource metrics or down to zero; the
//! two modes never combine within one image.

use serde::{Deserialize, Serialize};

use cellc_common::constants::AUTO_SCALING_METRIC_RESOURCE;

use crate::descriptor::{MetricDescriptor, ScalingPolicyDescriptor};

/// Target of a resource metric: a quantity string or a utilization percentage.
///
/// Discriminated by the declared representation: numbers are percentages,
/// strings are absolute quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricThreshold {
    /// Average utilization in percent.
    Utilization(u32),
    /// Average absolute value, e.g. `128Mi`.
    Value(String),
}

/// One resource-based scaling target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetric {
    /// Metric type, always `Resource`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Resource and its target.
    pub resource: MetricTarget,
}

/// Resource name plus target, serialized with the cluster field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricTarget {
    /// `cpu` or `memory`.
    pub name: String,
    /// Absolute target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_average_value: Option<String>,
    /// Percentage target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_average_utilization: Option<u32>,
}

impl ResourceMetric {
    /// Builds a `Resource` metric for `name` with the given threshold.
    pub fn new(name: &str, threshold: &MetricThreshold) -> Self {
        let (target_average_value, target_average_utilization) = match threshold {
            MetricThreshold::Utilization(percent) => (None, Some(*percent)),
            MetricThreshold::Value(quantity) => (Some(quantity.clone()), None),
        };
        Self {
            kind: AUTO_SCALING_METRIC_RESOURCE.into(),
            resource: MetricTarget {
                name: name.into(),
                target_average_value,
                target_average_utilization,
            },
        }
    }
}

/// Metric-driven autoscaling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoScalingPolicy {
    /// Lower replica bound.
    pub min_replicas: u32,
    /// Upper replica bound.
    pub max_replicas: u32,
    /// Whether the policy may be overridden at instantiation.
    pub overridable: bool,
    /// Targets, cpu before memory.
    pub metrics: Vec<ResourceMetric>,
}

/// Scale-to-zero. The lower bound is always 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZeroScalingPolicy {
    /// Upper replica bound.
    pub max_replicas: Option<u32>,
    /// Concurrent requests per replica.
    pub concurrency: Option<u32>,
}

/// Discriminant of a [`ScalingPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingMode {
    /// Resource-metric autoscaling.
    AutoScaling,
    /// Scale-to-zero.
    ZeroScaling,
}

/// Scaling policy attached to a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalingPolicy {
    /// Resource-metric autoscaling.
    AutoScaling(AutoScalingPolicy),
    /// Scale-to-zero.
    ZeroScaling(ZeroScalingPolicy),
}

impl ScalingPolicy {
    /// Returns the scaling mode.
    pub const fn mode(&self) -> ScalingMode {
        match self {
            Self::AutoScaling(_) => ScalingMode::AutoScaling,
            Self::ZeroScaling(_) => ScalingMode::ZeroScaling,
        }
    }

    /// Extracts the policy of `component` from its declaration.
    pub fn from_descriptor(component: &str, descriptor: &ScalingPolicyDescriptor) -> Self {
        match descriptor {
            ScalingPolicyDescriptor::AutoScaling(auto) => {
                if auto.min_replicas > auto.max_replicas {
                    tracing::warn!(
                        component,
                        min = auto.min_replicas,
                        max = auto.max_replicas,
                        "minReplicas is greater than maxReplicas"
                    );
                }
                let metrics = [
                    ("cpu", auto.metrics.cpu.as_ref()),
                    ("memory", auto.metrics.memory.as_ref()),
                ]
                .into_iter()
                .filter_map(|(name, metric)| {
                    metric.map(|MetricDescriptor { threshold }| ResourceMetric::new(name, threshold))
                })
                .collect();
                Self::AutoScaling(AutoScalingPolicy {
                    min_replicas: auto.min_replicas,
                    max_replicas: auto.max_replicas,
                    overridable: auto.overridable,
                    metrics,
                })
            }
            ScalingPolicyDescriptor::ZeroScaling(zero) => Self::ZeroScaling(ZeroScalingPolicy {
                max_replicas: zero.max_replicas,
                concurrency: zero.concurrency_target,
            }),
        }
    }

    /// Projects the policy into its service-template form.
    pub fn to_spec(&self) -> AutoscalingSpec {
        match self {
            Self::AutoScaling(auto) => AutoscalingSpec {
                policy: AutoscalingPolicySpec {
                    min_replicas: auto.min_replicas,
                    max_replicas: Some(auto.max_replicas),
                    metrics: auto.metrics.clone(),
                    concurrency: None,
                },
                overridable: auto.overridable,
            },
            Self::ZeroScaling(zero) => AutoscalingSpec {
                policy: AutoscalingPolicySpec {
                    min_replicas: 0,
                    max_replicas: zero.max_replicas,
                    metrics: Vec::new(),
                    concurrency: zero.concurrency,
                },
                overridable: false,
            },
        }
    }
}

/// `autoscaling` block of a service template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoscalingSpec {
    /// Replica bounds and targets.
    pub policy: AutoscalingPolicySpec,
    /// Whether the policy may be overridden at instantiation.
    pub overridable: bool,
}

/// `autoscaling.policy` block of a service template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalingPolicySpec {
    /// Lower replica bound.
    pub min_replicas: u32,
    /// Upper replica bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<u32>,
    /// Resource targets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<ResourceMetric>,
    /// Concurrent requests per replica.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{AutoScalingDescriptor, MetricsDescriptor, ZeroScalingDescriptor};

    fn auto(min: u32, max: u32) -> ScalingPolicyDescriptor {
        ScalingPolicyDescriptor::AutoScaling(AutoScalingDescriptor {
            min_replicas: min,
            max_replicas: max,
            overridable: true,
            metrics: MetricsDescriptor {
                cpu: Some(MetricDescriptor {
                    threshold: MetricThreshold::Utilization(50),
                }),
                memory: Some(MetricDescriptor {
                    threshold: MetricThreshold::Value("128Mi".into()),
                }),
            },
        })
    }

    #[test]
    fn autoscaling_keeps_bounds_and_metric_order() {
        let policy = ScalingPolicy::from_descriptor("api", &auto(0, 5));
        assert_eq!(policy.mode(), ScalingMode::AutoScaling);
        let ScalingPolicy::AutoScaling(auto) = &policy else {
            panic!("expected autoscaling");
        };
        assert_eq!(auto.min_replicas, 0);
        assert_eq!(auto.max_replicas, 5);
        assert_eq!(auto.metrics[0].resource.name, "cpu");
        assert_eq!(auto.metrics[0].resource.target_average_utilization, Some(50));
        assert_eq!(
            auto.metrics[1].resource.target_average_value.as_deref(),
            Some("128Mi")
        );
    }

    #[test]
    fn min_above_max_is_accepted() {
        let policy = ScalingPolicy::from_descriptor("api", &auto(7, 2));
        assert!(matches!(
            policy,
            ScalingPolicy::AutoScaling(AutoScalingPolicy { min_replicas: 7, max_replicas: 2, .. })
        ));
    }

    #[test]
    fn zero_scaling_forces_min_zero() {
        let descriptor = ScalingPolicyDescriptor::ZeroScaling(ZeroScalingDescriptor {
            max_replicas: Some(3),
            concurrency_target: Some(25),
        });
        let spec = ScalingPolicy::from_descriptor("fn", &descriptor).to_spec();
        assert_eq!(spec.policy.min_replicas, 0);
        assert_eq!(spec.policy.max_replicas, Some(3));
        assert_eq!(spec.policy.concurrency, Some(25));
        assert!(!spec.overridable);
    }

    #[test]
    fn autoscaling_spec_serializes_cluster_fields() {
        let spec = ScalingPolicy::from_descriptor("api", &auto(1, 4)).to_spec();
        let json = serde_json::to_value(&spec).expect("serialize");
        assert_eq!(json["overridable"], true);
        assert_eq!(json["policy"]["minReplicas"], 1);
        assert_eq!(json["policy"]["metrics"][0]["type"], "Resource");
        assert_eq!(
            json["policy"]["metrics"][0]["resource"]["targetAverageUtilization"],
            50
        );
        assert!(json["policy"].get("concurrency").is_none());
    }
}
