use super::{fatal, Stage};
use crate::{
    error::MigrationError,
    legacy::LegacyClassification,
    migration::{context::MigrationContext, progress::StageKind},
    services::{AutoDetectionRule, NodeSpec},
};

const CATEGORY_PRIORITY: i32 = 100;
const OBJECT_PRIORITY: i32 = 50;
const RULE_PRIORITY: i32 = 100;

pub(crate) struct ClassificationStage;

impl Stage for ClassificationStage {
    fn kind(&self) -> StageKind {
        StageKind::Classifications
    }

    fn execute(&self, ctx: &mut MigrationContext<'_>) -> Result<(), MigrationError> {
        let parsed = ctx.legacy_classification();
        let outcome = register_groups(ctx, &parsed);

        // Rules registered before a cancel are still persisted.
        let rules_path = ctx.profile().rules_path();
        ctx.services()
            .auto_detection
            .save_rules(&rules_path)
            .map_err(|err| {
                fatal(
                    StageKind::Classifications,
                    err.context("save auto-detection rules"),
                )
            })?;
        let registered = ctx.totals().rules_registered;
        ctx.info(format!(
            "Saved {registered} auto-detection rule(s) to {}",
            rules_path.display()
        ));
        outcome
    }
}

fn register_groups(
    ctx: &mut MigrationContext<'_>,
    parsed: &LegacyClassification,
) -> Result<(), MigrationError> {
    let classification = &ctx.services().classification;
    let auto_detection = &ctx.services().auto_detection;
    let total: usize = parsed
        .groups
        .iter()
        .map(|group| group.objects.len() + 1)
        .sum();
    let mut done = 0;

    for group in &parsed.groups {
        ctx.check_cancelled()?;
        ctx.report(done, total, Some(group.category.clone()));
        done += 1;

        let category = group.category.as_str();
        let spec = NodeSpec {
            id: category,
            name: category,
            parent_id: None,
            priority: CATEGORY_PRIORITY,
            description: None,
        };
        match classification.create_node_if_absent(spec) {
            Ok(Some(_)) => {
                ctx.created();
                ctx.totals().categories_created += 1;
            }
            Ok(None) => {
                ctx.skipped();
                ctx.totals().nodes_skipped += 1;
            }
            Err(err) => {
                ctx.warn(format!("category {category}: {err:#}"));
                done += group.objects.len();
                continue;
            }
        }

        for object in &group.objects {
            ctx.check_cancelled()?;
            ctx.report(done, total, Some(format!("{category}/{object}")));
            done += 1;

            let spec = NodeSpec {
                id: object,
                name: object,
                parent_id: Some(category),
                priority: OBJECT_PRIORITY,
                description: None,
            };
            match classification.create_node_if_absent(spec) {
                Ok(Some(_)) => {
                    ctx.created();
                    ctx.totals().objects_created += 1;
                }
                Ok(None) => {
                    ctx.skipped();
                    ctx.totals().nodes_skipped += 1;
                    if let Ok(Some(existing)) = classification.node(object) {
                        if existing.parent_id.as_deref() != Some(category) {
                            ctx.warn(format!(
                                "object {object} already exists under {}; not moved to {category}",
                                existing.parent_id.as_deref().unwrap_or("the root")
                            ));
                        }
                    }
                }
                Err(err) => {
                    ctx.warn(format!("object {category}/{object}: {err:#}"));
                    continue;
                }
            }

            let rule = AutoDetectionRule {
                name: format!("{category}/{object}"),
                pattern: format!("*{object}*"),
                category: object.clone(),
                priority: RULE_PRIORITY,
            };
            match auto_detection.add_rule(rule) {
                Ok(()) => ctx.totals().rules_registered += 1,
                Err(err) => ctx.warn(format!("rule for {category}/{object}: {err:#}")),
            }
        }
    }
    ctx.report(total, total, None);
    Ok(())
}
