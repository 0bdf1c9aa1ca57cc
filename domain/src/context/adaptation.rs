//! Adaptation rules and the adaptation transform
//!
//! Rules are plain data: a [`RuleCondition`] predicate over a [`Tool`] and a
//! [`RuleAction`] transform over it. Rules are registered per domain and
//! applied in registration order by [`adapt_tool`].

use serde::{Deserialize, Serialize};

use super::entities::DomainBundle;
use crate::tool::entities::{FieldType, SchemaField, Tool};

/// Predicate deciding whether a rule applies to a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleCondition {
    Always,
    CategoryIs { category: String },
    MobileOptimized,
    MissingInputField { name: String },
    MissingOutputField { name: String },
    HasCapability { capability: String },
    TimeoutAbove { timeout_ms: u64 },
    All { conditions: Vec<RuleCondition> },
    Any { conditions: Vec<RuleCondition> },
    Not { condition: Box<RuleCondition> },
}

impl RuleCondition {
    pub fn evaluate(&self, tool: &Tool) -> bool {
        match self {
            RuleCondition::Always => true,
            RuleCondition::CategoryIs { category } => &tool.category == category,
            RuleCondition::MobileOptimized => tool.mobile.optimized,
            RuleCondition::MissingInputField { name } => !tool.input_schema.has_field(name),
            RuleCondition::MissingOutputField { name } => !tool.output_schema.has_field(name),
            RuleCondition::HasCapability { capability } => tool.has_capability(capability),
            RuleCondition::TimeoutAbove { timeout_ms } => tool.timeout_ms > *timeout_ms,
            RuleCondition::All { conditions } => conditions.iter().all(|c| c.evaluate(tool)),
            RuleCondition::Any { conditions } => conditions.iter().any(|c| c.evaluate(tool)),
            RuleCondition::Not { condition } => !condition.evaluate(tool),
        }
    }
}

/// Transform applied to a tool when its rule's condition holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleAction {
    AddInputField { field: SchemaField },
    AddOutputField { field: SchemaField },
    RemoveInputField { name: String },
    ClampTimeout { max_ms: u64 },
    ClampMemory { max_mb: u64 },
    AddCapability { capability: String },
    Sequence { actions: Vec<RuleAction> },
}

impl RuleAction {
    pub fn apply(&self, mut tool: Tool) -> Tool {
        match self {
            RuleAction::AddInputField { field } => {
                // Rule-added fields never close an open schema
                if tool.input_schema.is_open() {
                    tool.input_schema.additional_properties = true;
                }
                tool.input_schema.add_field(field.clone());
            }
            RuleAction::AddOutputField { field } => tool.output_schema.add_field(field.clone()),
            RuleAction::RemoveInputField { name } => {
                tool.input_schema.remove_field(name);
            }
            RuleAction::ClampTimeout { max_ms } => tool.timeout_ms = tool.timeout_ms.min(*max_ms),
            RuleAction::ClampMemory { max_mb } => {
                tool.performance.memory_usage_mb = tool.performance.memory_usage_mb.min(*max_mb)
            }
            RuleAction::AddCapability { capability } => {
                if !tool.has_capability(capability) {
                    tool.capabilities.push(capability.clone());
                }
            }
            RuleAction::Sequence { actions } => {
                return actions.iter().fold(tool, |tool, action| action.apply(tool));
            }
        }
        tool
    }
}

/// A conditional schema transform registered for a domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationRule {
    pub id: String,
    pub name: String,
    pub condition: RuleCondition,
    pub action: RuleAction,
}

impl AdaptationRule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        condition: RuleCondition,
        action: RuleAction,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            condition,
            action,
        }
    }

    pub fn applies_to(&self, tool: &Tool) -> bool {
        self.condition.evaluate(tool)
    }

    /// Apply the action if the condition holds, otherwise return the tool unchanged.
    pub fn apply(&self, tool: Tool) -> Tool {
        if self.applies_to(&tool) {
            self.action.apply(tool)
        } else {
            tool
        }
    }
}

fn add_optional_input(rule_id: &str, name: &str, field_type: FieldType, description: &str) -> AdaptationRule {
    AdaptationRule::new(
        rule_id,
        format!("Add {} input", name),
        RuleCondition::MissingInputField {
            name: name.to_string(),
        },
        RuleAction::AddInputField {
            field: SchemaField::new(name, field_type, false).with_description(description),
        },
    )
}

/// Rules for touch devices: gesture and orientation inputs.
pub fn mobile_rules() -> Vec<AdaptationRule> {
    vec![
        add_optional_input(
            "mobile.touch_gesture",
            "touch_gesture",
            FieldType::String,
            "Gesture that triggered the call (tap, swipe, long_press)",
        ),
        add_optional_input(
            "mobile.device_orientation",
            "device_orientation",
            FieldType::String,
            "Device orientation (portrait, landscape)",
        ),
    ]
}

/// Rules for browser contexts: user agent and CSRF token inputs.
pub fn web_rules() -> Vec<AdaptationRule> {
    vec![
        add_optional_input(
            "web.user_agent",
            "user_agent",
            FieldType::String,
            "Browser user agent string",
        ),
        add_optional_input(
            "web.csrf_token",
            "csrf_token",
            FieldType::String,
            "CSRF token of the originating page",
        ),
    ]
}

pub fn desktop_rules() -> Vec<AdaptationRule> {
    vec![add_optional_input(
        "desktop.window_id",
        "window_id",
        FieldType::String,
        "Window that issued the call",
    )]
}

/// Built-in rule set for a domain category.
pub fn default_rules_for(category: &str) -> Vec<AdaptationRule> {
    match category {
        "mobile" => mobile_rules(),
        "web" => web_rules(),
        "desktop" => desktop_rules(),
        _ => Vec::new(),
    }
}

/// Produce a copy of `tool` adapted to the target domain.
///
/// 1. the domain context is replaced by the target's
/// 2. timeout, average execution time and memory are clamped to the
///    target's constraints
/// 3. the mobile-optimized flag survives only if the target requires mobile
///    optimization and the tool was already optimized
/// 4. every rule of the bundle is applied in order
pub fn adapt_tool(tool: &Tool, target: &DomainBundle) -> Tool {
    let constraints = &target.constraints;
    let mut adapted = tool.clone();

    adapted.domain = target.context.clone();
    adapted.timeout_ms = tool.timeout_ms.min(constraints.max_execution_time_ms);
    adapted.performance.avg_execution_time_ms = tool
        .performance
        .avg_execution_time_ms
        .min(constraints.max_execution_time_ms);
    adapted.performance.memory_usage_mb = tool
        .performance
        .memory_usage_mb
        .min(constraints.max_memory_mb);
    adapted.mobile.optimized =
        target.context.requires_mobile_optimization() && tool.mobile.optimized;

    target
        .rules
        .iter()
        .fold(adapted, |tool, rule| rule.apply(tool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::entities::{DomainContext, MobileContext};
    use crate::tool::entities::{MobileProfile, PerformanceProfile};

    fn mobile_bundle(max_ms: u64) -> DomainBundle {
        DomainBundle::new(
            DomainContext::new("mobile", "mobile", "1.0.0")
                .with_max_execution_time_ms(max_ms)
                .with_max_memory_mb(128)
                .with_mobile(MobileContext {
                    requires_optimization: true,
                    ..Default::default()
                }),
        )
        .with_rules(mobile_rules())
    }

    #[test]
    fn test_timeout_clamped_to_domain() {
        let tool = Tool::new("t", "t").with_timeout_ms(60_000);
        let adapted = adapt_tool(&tool, &mobile_bundle(10_000));
        assert_eq!(adapted.timeout_ms, 10_000);
        // source untouched
        assert_eq!(tool.timeout_ms, 60_000);
    }

    #[test]
    fn test_timeout_below_limit_kept() {
        let tool = Tool::new("t", "t").with_timeout_ms(5_000);
        let adapted = adapt_tool(&tool, &mobile_bundle(10_000));
        assert_eq!(adapted.timeout_ms, 5_000);
    }

    #[test]
    fn test_performance_clamped() {
        let tool = Tool::new("t", "t").with_performance(PerformanceProfile {
            avg_execution_time_ms: 20_000,
            memory_usage_mb: 1_024,
            ..Default::default()
        });
        let adapted = adapt_tool(&tool, &mobile_bundle(10_000));
        assert_eq!(adapted.performance.avg_execution_time_ms, 10_000);
        assert_eq!(adapted.performance.memory_usage_mb, 128);
    }

    #[test]
    fn test_mobile_flag_requires_both_sides() {
        let optimized = Tool::new("t", "t").with_mobile(MobileProfile {
            optimized: true,
            ..Default::default()
        });
        assert!(adapt_tool(&optimized, &mobile_bundle(10_000)).mobile.optimized);

        let plain = Tool::new("t", "t");
        assert!(!adapt_tool(&plain, &mobile_bundle(10_000)).mobile.optimized);

        let web = DomainBundle::new(DomainContext::new("web", "web", "1.0.0"));
        assert!(!adapt_tool(&optimized, &web).mobile.optimized);
    }

    #[test]
    fn test_domain_replaced_and_rules_applied_in_order() {
        let tool = Tool::new("t", "t");
        let adapted = adapt_tool(&tool, &mobile_bundle(10_000));

        assert_eq!(adapted.domain.id, "mobile");
        let names: Vec<&str> = adapted
            .input_schema
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["touch_gesture", "device_orientation"]);
    }

    #[test]
    fn test_web_rules_add_fields() {
        let web = DomainBundle::new(DomainContext::new("web", "web", "1.0.0")).with_rules(web_rules());
        let adapted = adapt_tool(&Tool::new("t", "t"), &web);
        assert!(adapted.input_schema.has_field("user_agent"));
        assert!(adapted.input_schema.has_field("csrf_token"));
    }

    #[test]
    fn test_rule_fields_keep_open_schema_open() {
        let web = DomainBundle::new(DomainContext::new("web", "web", "1.0.0")).with_rules(web_rules());

        let open = adapt_tool(&Tool::new("t", "t"), &web);
        assert!(open.input_schema.additional_properties);
        assert!(open.input_schema.is_open());

        let closed = Tool::new("t", "t").with_input_field(SchemaField::new("query", FieldType::String, true));
        let adapted = adapt_tool(&closed, &web);
        assert!(!adapted.input_schema.is_open());
        assert!(adapted.input_schema.has_field("user_agent"));
    }

    #[test]
    fn test_rule_condition_skips_existing_field() {
        let tool = Tool::new("t", "t").with_input_field(
            SchemaField::new("touch_gesture", FieldType::Object, true),
        );
        let adapted = adapt_tool(&tool, &mobile_bundle(10_000));
        let field = adapted.input_schema.field("touch_gesture").unwrap();
        assert_eq!(field.field_type, FieldType::Object);
        assert!(field.required);
    }

    #[test]
    fn test_composite_conditions() {
        let tool = Tool::new("t", "t").with_category("web").with_timeout_ms(90_000);
        let condition = RuleCondition::All {
            conditions: vec![
                RuleCondition::CategoryIs {
                    category: "web".to_string(),
                },
                RuleCondition::Not {
                    condition: Box::new(RuleCondition::MobileOptimized),
                },
                RuleCondition::TimeoutAbove { timeout_ms: 60_000 },
            ],
        };
        assert!(condition.evaluate(&tool));

        let rule = AdaptationRule::new(
            "cap",
            "cap slow web tools",
            condition,
            RuleAction::Sequence {
                actions: vec![
                    RuleAction::ClampTimeout { max_ms: 60_000 },
                    RuleAction::AddCapability {
                        capability: "throttled".to_string(),
                    },
                ],
            },
        );
        let adapted = rule.apply(tool);
        assert_eq!(adapted.timeout_ms, 60_000);
        assert!(adapted.has_capability("throttled"));
    }

    #[test]
    fn test_rule_roundtrips_as_data() {
        let rule = &mobile_rules()[0];
        let json = serde_json::to_value(rule).unwrap();
        assert_eq!(json["condition"]["kind"], "missing_input_field");
        assert_eq!(json["action"]["kind"], "add_input_field");
    }
}
