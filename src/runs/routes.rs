// Detail-page URLs for training runs
//
// The record only knows its primary key; the route template belongs to
// whoever serves the pages.

use super::record::RunId;

/// Default mount point of the run detail pages
pub const DEFAULT_ROUTE_PREFIX: &str = "/train";

/// Turns a run key into the URL callers redirect to after create/edit
pub trait RouteResolver {
    fn detail_url(&self, id: RunId) -> String;
}

/// `<prefix>/<id>/` routes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRoutes {
    prefix: String,
}

impl PathRoutes {
    pub fn new(prefix: &str) -> Self {
        let trimmed = prefix.trim_end_matches('/');
        let prefix = if trimmed.is_empty() || trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        };
        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for PathRoutes {
    fn default() -> Self {
        Self::new(DEFAULT_ROUTE_PREFIX)
    }
}

impl RouteResolver for PathRoutes {
    fn detail_url(&self, id: RunId) -> String {
        format!("{}/{}/", self.prefix, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routes() {
        assert_eq!(PathRoutes::default().detail_url(RunId(5)), "/train/5/");
    }

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(PathRoutes::new("runs/").detail_url(RunId(1)), "/runs/1/");
        assert_eq!(PathRoutes::new("/").detail_url(RunId(1)), "/1/");
    }
}
