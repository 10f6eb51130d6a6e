//! The `install.properties` file the Ranger admin image reads on first boot.

pub const DEFAULT_INSTALL_PROPERTIES: &str =
    include_str!("../../config/rangeradmin-install.properties");

pub const DB_HOST_KEY: &str = "db_host";
pub const DB_ROOT_USER_KEY: &str = "db_root_user";
pub const DB_ROOT_PASSWORD_KEY: &str = "db_root_password";
pub const AUDIT_SOLR_URLS_KEY: &str = "audit_solr_urls";
pub const AUDIT_COLLECTION_KEY: &str = "audit_solr_collection_name";
pub const ADMIN_PASSWORD_KEY: &str = "rangerAdmin_password";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Raw(String),
    Entry { key: String, value: String },
}

/// Ordered `key=value` document. Comments and blank lines survive a
/// parse/render cycle untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallProperties {
    lines: Vec<Line>,
}

impl InstallProperties {
    pub fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|line| {
                let trimmed = line.trim_start();
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    return Line::Raw(line.to_string());
                }
                match line.split_once('=') {
                    Some((key, value)) => Line::Entry {
                        key: key.trim().to_string(),
                        value: value.trim().to_string(),
                    },
                    None => Line::Raw(line.to_string()),
                }
            })
            .collect();

        Self { lines }
    }

    pub fn template() -> Self {
        Self::parse(DEFAULT_INSTALL_PROPERTIES)
    }

    /// Template pointed at a database at `db_host_port` and a Solr audit
    /// store at `audit_host_port`
    pub fn for_hosts(db_host_port: &str, audit_host_port: &str) -> Self {
        let mut properties = Self::template();
        properties.point_at(db_host_port, audit_host_port);
        properties
    }

    /// Rewrites the database host and the Solr audit URL. The URL uses the
    /// collection currently set in this document.
    pub fn point_at(&mut self, db_host_port: &str, audit_host_port: &str) {
        let collection = self
            .get(AUDIT_COLLECTION_KEY)
            .unwrap_or("ranger_audits")
            .to_string();

        self.set(DB_HOST_KEY, db_host_port);
        self.set(
            AUDIT_SOLR_URLS_KEY,
            format!("http://{audit_host_port}/solr/{collection}"),
        );
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Entry { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Replaces an existing key in place, or appends it
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        for line in &mut self.lines {
            if let Line::Entry { key: k, value: v } = line {
                if k == key {
                    *v = value;
                    return;
                }
            }
        }
        self.lines.push(Line::Entry {
            key: key.to_string(),
            value,
        });
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Raw(raw) => out.push_str(raw),
                Line::Entry { key, value } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(value);
                }
            }
            out.push('\n');
        }
        out
    }
}

impl Default for InstallProperties {
    fn default() -> Self {
        Self::template()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_targets_postgres_and_solr() {
        let props = InstallProperties::template();
        assert_eq!(props.get("DB_FLAVOR"), Some("POSTGRES"));
        assert_eq!(props.get("audit_store"), Some("solr"));
        assert_eq!(props.get(ADMIN_PASSWORD_KEY), Some("Rangeradmin1"));
    }

    #[test]
    fn for_hosts_rewrites_connection_keys() {
        let props = InstallProperties::for_hosts("db-1:5432", "solr-1:8983");
        assert_eq!(props.get(DB_HOST_KEY), Some("db-1:5432"));
        assert_eq!(
            props.get(AUDIT_SOLR_URLS_KEY),
            Some("http://solr-1:8983/solr/ranger_audits")
        );
    }

    #[test]
    fn point_at_uses_current_collection() {
        let mut props = InstallProperties::template();
        props.set(AUDIT_COLLECTION_KEY, "my_audits");
        props.point_at("db-1:5432", "solr-1:8983");
        assert_eq!(
            props.get(AUDIT_SOLR_URLS_KEY),
            Some("http://solr-1:8983/solr/my_audits")
        );
    }

    #[test]
    fn set_replaces_in_place_and_appends_new_keys() {
        let mut props = InstallProperties::parse("# header\na=1\n\nb=2\n");
        props.set("a", "10");
        props.set("c", "3");

        assert_eq!(props.render(), "# header\na=10\n\nb=2\nc=3\n");
    }

    #[test]
    fn values_may_contain_equals_signs() {
        let props = InstallProperties::parse("jdbc=url?a=b\n");
        assert_eq!(props.get("jdbc"), Some("url?a=b"));
    }

    #[test]
    fn empty_values_render_as_empty() {
        let props = InstallProperties::parse("spnego_keytab=\n");
        assert_eq!(props.get("spnego_keytab"), Some(""));
        assert_eq!(props.render(), "spnego_keytab=\n");
    }
}
