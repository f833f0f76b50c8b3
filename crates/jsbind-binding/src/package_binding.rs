//! Package facades.

use crate::comparator::is_equal;
use crate::context::PassContext;
use jsbind_lookup::BindingId;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

pub struct PackageBinding {
    context: Arc<PassContext>,
    id: BindingId,
    key: OnceCell<String>,
    components: OnceCell<Vec<String>>,
    name: OnceCell<String>,
}

impl fmt::Debug for PackageBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageBinding")
            .field("name", &self.name())
            .finish()
    }
}

impl PackageBinding {
    pub(crate) fn new(context: Arc<PassContext>, id: BindingId) -> Self {
        PackageBinding {
            context,
            id,
            key: OnceCell::new(),
            components: OnceCell::new(),
            name: OnceCell::new(),
        }
    }

    pub(crate) fn raw_id(&self) -> BindingId {
        self.id
    }

    /// Slash-separated compound name; empty for the unnamed package.
    pub fn key(&self) -> &str {
        self.key.get_or_init(|| {
            jsbind_lookup::unique_key(&self.context.read().store, self.id)
        })
    }

    pub fn components(&self) -> &[String] {
        self.components.get_or_init(|| {
            let context = &self.context;
            let env = context.read();
            env.store
                .package(self.id)
                .map(|data| data.compound_name.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default()
        })
    }

    /// Dotted name.
    pub fn name(&self) -> &str {
        self.name.get_or_init(|| self.components().join("."))
    }

    pub fn is_unnamed(&self) -> bool {
        self.components().is_empty()
    }

    pub fn is_equal_to(&self, other: &PackageBinding) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        let (left, right) = (&self.context, &other.context);
        if Arc::ptr_eq(left, right) {
            let env = left.read();
            return is_equal(&env.store, self.id, &env.store, other.id);
        }
        let left_env = left.read();
        let right_env = right.read();
        is_equal(&left_env.store, self.id, &right_env.store, other.id)
    }
}
