//! Snapshot of the merge-field and partial catalogs
//!
//! Loaded once per request that validates or renders template content.

use std::collections::HashMap;

use crate::domain::entities::{LayoutPartial, MergeField};
use crate::domain::ports::{LayoutPartialRepository, MergeFieldRepository};
use crate::error::AppError;
use crate::sanitizer::{Catalog, RenderContext};

pub struct ContentCatalog {
    pub fields: Vec<MergeField>,
    pub partials: Vec<LayoutPartial>,
}

impl ContentCatalog {
    pub async fn load<M, P>(fields: &M, partials: &P) -> Result<Self, AppError>
    where
        M: MergeFieldRepository,
        P: LayoutPartialRepository,
    {
        Ok(Self {
            fields: fields.all().await?,
            partials: partials.all().await?,
        })
    }

    /// Known names, for flagging unknown tokens
    pub fn names(&self) -> Catalog<'_> {
        Catalog {
            merge_keys: self.fields.iter().map(|f| f.key.as_str()).collect(),
            partials: self.partials.iter().map(|p| p.name.as_str()).collect(),
        }
    }

    /// Render inputs with catalog samples as fallbacks for `values`
    pub fn render_context(&self, values: HashMap<String, String>) -> RenderContext<'_> {
        RenderContext {
            values,
            samples: self
                .fields
                .iter()
                .filter_map(|f| f.sample_value.as_deref().map(|s| (f.key.as_str(), s)))
                .collect(),
            partials: self
                .partials
                .iter()
                .map(|p| (p.name.as_str(), p.content.as_str()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        test_merge_field, test_partial, InMemoryLayoutPartialRepository,
        InMemoryMergeFieldRepository,
    };

    #[tokio::test]
    async fn builds_names_and_samples() {
        let fields = InMemoryMergeFieldRepository::new()
            .with_field(test_merge_field("listing.price", Some("$450,000")))
            .with_field(test_merge_field("agent.name", None));
        let partials =
            InMemoryLayoutPartialRepository::new().with_partial(test_partial("footer", "<p>f</p>"));

        let catalog = ContentCatalog::load(&fields, &partials).await.unwrap();

        let names = catalog.names();
        assert!(names.merge_keys.contains("listing.price"));
        assert!(names.merge_keys.contains("agent.name"));
        assert!(names.partials.contains("footer"));

        let ctx = catalog.render_context(HashMap::new());
        assert_eq!(ctx.samples.get("listing.price"), Some(&"$450,000"));
        assert!(!ctx.samples.contains_key("agent.name"));
        assert_eq!(ctx.partials.get("footer"), Some(&"<p>f</p>"));
    }
}
