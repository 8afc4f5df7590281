//! Tenant and dashboard display strings.

use crate::error::Result;
use crate::view::{names, SharedView};

use async_trait::async_trait;

/// Title used when the view carries none.
pub const FALLBACK_DASHBOARD_TITLE: &str = "Dashboard";

/// Resolves the strings stamped on the cover page.
#[async_trait(?Send)]
pub trait InfoResolver {
    async fn tenant_name(&self) -> Result<String>;
    async fn dashboard_title(&self) -> Result<String>;
}

/// Fixed strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticInfo {
    pub tenant: String,
    pub dashboard: String,
}

impl StaticInfo {
    pub fn new(tenant: impl Into<String>, dashboard: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            dashboard: dashboard.into(),
        }
    }
}

#[async_trait(?Send)]
impl InfoResolver for StaticInfo {
    async fn tenant_name(&self) -> Result<String> {
        Ok(self.tenant.clone())
    }

    async fn dashboard_title(&self) -> Result<String> {
        Ok(self.dashboard.clone())
    }
}

/// Reads the strings from the dashboard view.
///
/// The tenant comes from the root's `data-tenant` attribute, falling back to
/// the configured organization. The title is the text of the title element.
pub struct ViewInfoResolver {
    view: SharedView,
    organization: String,
}

impl ViewInfoResolver {
    pub fn new(view: SharedView, organization: impl Into<String>) -> Self {
        Self {
            view,
            organization: organization.into(),
        }
    }
}

#[async_trait(?Send)]
impl InfoResolver for ViewInfoResolver {
    async fn tenant_name(&self) -> Result<String> {
        let tree = self.view.borrow();
        let tenant = tree
            .find_first(tree.root(), names::DASHBOARD_ROOT)
            .and_then(|root| tree.node(root).attr(names::ATTR_TENANT))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(self.organization.as_str());
        Ok(tenant.to_string())
    }

    async fn dashboard_title(&self) -> Result<String> {
        let tree = self.view.borrow();
        let title = tree
            .find_first(tree.root(), names::DASHBOARD_TITLE)
            .map(|node| tree.text_content(node))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| FALLBACK_DASHBOARD_TITLE.to_string());
        Ok(title)
    }
}
