use serde_json::Value;

/// Tag names resolved without a field lookup.
pub const BUILTIN_TAGS: [&str; 22] = [
    "id",
    "key",
    "ip",
    "sitename",
    "siteurl",
    "admin_email",
    "frmurl",
    "get",
    "post_id",
    "post-id",
    "parent_id",
    "parent-id",
    "created_at",
    "created-at",
    "updated_at",
    "updated-at",
    "created_by",
    "created-by",
    "updated_by",
    "updated-by",
    "user_agent",
    "user-agent",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Id,
    Key,
    Ip,
    SiteName,
    SiteUrl,
    AdminEmail,
    PluginUrl,
    Get,
    PostId,
    ParentId,
    CreatedAt,
    UpdatedAt,
    CreatedBy,
    UpdatedBy,
    UserAgent,
}

impl Builtin {
    /// Dash and underscore spellings are interchangeable.
    pub fn parse(name: &str) -> Option<Self> {
        let builtin = match name.replace('-', "_").as_str() {
            "id" => Builtin::Id,
            "key" => Builtin::Key,
            "ip" => Builtin::Ip,
            "sitename" => Builtin::SiteName,
            "siteurl" => Builtin::SiteUrl,
            "admin_email" => Builtin::AdminEmail,
            "frmurl" => Builtin::PluginUrl,
            "get" => Builtin::Get,
            "post_id" => Builtin::PostId,
            "parent_id" => Builtin::ParentId,
            "created_at" => Builtin::CreatedAt,
            "updated_at" => Builtin::UpdatedAt,
            "created_by" => Builtin::CreatedBy,
            "updated_by" => Builtin::UpdatedBy,
            "user_agent" => Builtin::UserAgent,
            _ => return None,
        };
        Some(builtin)
    }

    /// Whether the value comes from the entry rather than the site or request.
    pub fn needs_entry(&self) -> bool {
        !matches!(
            self,
            Builtin::SiteName | Builtin::SiteUrl | Builtin::AdminEmail | Builtin::PluginUrl | Builtin::Get
        )
    }
}

pub(crate) fn optional_id(id: Option<u64>) -> Value {
    id.map_or(Value::Null, Value::from)
}
