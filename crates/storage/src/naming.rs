//! Cache naming engine.
//!
//! Maps a product descriptor plus target geography to a stable,
//! collision-resistant cache key. The key layout groups artifacts by
//! format before geography, so one prefix enumerates every grid (or every
//! table) independent of product type:
//!
//! `<environment>/<family>/<format-extension>/<geography-id>__<admin-level>__<product-file-id>.<ext>`
//!
//! The product file id embeds the class name and the `__<PascalKey>_<value>`
//! segments of its major then minor naming attributes.

use layers_common::{NamingAttribute, OutputKind, Product, ProductFamily};

use crate::config::Environment;
use crate::uri::StorageUri;

/// Whether a product's parameters are all at their declared defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheClass {
    /// Eligible for the shared published cache tree.
    Standard,
    /// Routed to the derivative tree.
    Custom,
}

/// Classify a product by its naming-attribute defaults.
pub fn classify(product: &dyn Product) -> CacheClass {
    if product.is_standard() {
        CacheClass::Standard
    } else {
        CacheClass::Custom
    }
}

/// Render a snake_case attribute key as PascalCase.
fn pascal_case(key: &str) -> String {
    key.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn render_attributes(attrs: &[NamingAttribute]) -> String {
    attrs
        .iter()
        .map(|a| format!("__{}_{}", pascal_case(a.key), a.value))
        .collect()
}

/// The file id for a product instance: class name plus serialized major
/// then minor naming attributes.
pub fn product_file_id(product: &dyn Product) -> String {
    format!(
        "{}{}{}",
        product.class_name(),
        render_attributes(&product.major_attributes()),
        render_attributes(&product.minor_attributes()),
    )
}

/// A fully resolved cache key for a geography-scoped product artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheKey {
    pub environment: Environment,
    pub family: ProductFamily,
    pub kind: OutputKind,
    pub geography_id: String,
    pub admin_level: String,
    pub file_id: String,
    pub class: CacheClass,
}

impl CacheKey {
    /// Build the key for a product targeting a geography.
    pub fn for_product(
        environment: Environment,
        product: &dyn Product,
        geography_id: &str,
        admin_level: &str,
    ) -> Self {
        Self {
            environment,
            family: product.family(),
            kind: product.output_kind(),
            geography_id: geography_id.to_string(),
            admin_level: admin_level.to_string(),
            file_id: product_file_id(product),
            class: classify(product),
        }
    }

    /// The object path under the cache root.
    pub fn object_path(&self) -> String {
        let ext = self.kind.extension();
        format!(
            "{}/{}/{}/{}__{}__{}.{}",
            self.environment,
            self.family.as_str(),
            ext,
            self.geography_id,
            self.admin_level,
            self.file_id,
            ext,
        )
    }

    /// The prefix a tiled job writes its per-tile artifacts under: the
    /// object path without its extension.
    pub fn tile_prefix(&self) -> String {
        format!(
            "{}/{}/{}/{}__{}__{}",
            self.environment,
            self.family.as_str(),
            self.kind.extension(),
            self.geography_id,
            self.admin_level,
            self.file_id,
        )
    }

    /// The full storage location under a cache root.
    pub fn uri(&self, root: &StorageUri) -> StorageUri {
        root.join(&self.object_path())
    }
}
