use super::ProfileStoring;
use crate::{
    http::{HttpClient, HttpFactory, HttpLabel},
    models::ProfileRecord,
};
use anyhow::{Context as _, Result};
use url::Url;

/// The table profiles are stored in by default.
pub const DEFAULT_PROFILES_TABLE: &str = "Profiles";

/// The columns of the profiles table written on every upsert.
pub const DEFAULT_PROFILE_COLUMNS: &[&str] = &[
    "account",
    "username",
    "name",
    "description",
    "image",
    "image_medium",
    "image_small",
    "token_id",
];

/// Conflicting rows are overwritten, and every column in `columns` that the
/// record does not carry is reset to its default.
const PREFER: &str = "resolution=merge-duplicates,missing=default,return=minimal";

/// A profile store backed by the PostgREST API of a Supabase project.
///
/// Requests are authorized with the service role key so that row level
/// security policies do not apply to writes.
#[derive(Debug)]
pub struct PostgrestProfileStore {
    rest_url: Url,
    table: String,
    columns: String,
    service_role_key: String,
    authorization: String,
    client: HttpClient,
}

impl PostgrestProfileStore {
    pub fn new(
        http_factory: &HttpFactory,
        supabase_url: &Url,
        table: impl Into<String>,
        columns: &[impl AsRef<str>],
        service_role_key: impl Into<String>,
    ) -> Result<Self> {
        let client = http_factory
            .create()
            .context("failed to initialize HTTP client")?;
        let rest_url = rest_url(supabase_url)?;
        let columns = columns
            .iter()
            .map(|column| column.as_ref().trim())
            .filter(|column| !column.is_empty())
            .collect::<Vec<_>>()
            .join(",");
        let service_role_key = service_role_key.into();
        Ok(PostgrestProfileStore {
            rest_url,
            table: table.into(),
            columns,
            authorization: format!("Bearer {}", service_role_key),
            service_role_key,
            client,
        })
    }

    fn upsert_url(&self, on_conflict: &str) -> Result<Url> {
        let mut url = self
            .rest_url
            .join(&self.table)
            .with_context(|| format!("invalid table name '{}'", self.table))?;
        url.query_pairs_mut()
            .append_pair("on_conflict", on_conflict)
            .append_pair("columns", &self.columns);
        Ok(url)
    }

    fn headers(&self) -> [(&str, &str); 3] {
        [
            ("apikey", self.service_role_key.as_str()),
            ("Authorization", self.authorization.as_str()),
            ("Prefer", PREFER),
        ]
    }
}

#[async_trait::async_trait]
impl ProfileStoring for PostgrestProfileStore {
    async fn upsert(&self, record: &ProfileRecord, on_conflict: &str) -> Result<()> {
        let url = self.upsert_url(on_conflict)?;
        self.client
            .post_json_async(url.as_str(), record, &self.headers(), HttpLabel::Store)
            .await
            .with_context(|| format!("failed to upsert into '{}'", self.table))?;
        Ok(())
    }
}

/// The PostgREST root of a Supabase project, always ending with a `/` so
/// table names can be joined onto it.
fn rest_url(supabase_url: &Url) -> Result<Url> {
    let mut base = supabase_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("rest/v1/")
        .with_context(|| format!("invalid supabase URL {}", supabase_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::TokenId,
        util::{test_server::serve_once, FutureWaitExt as _},
    };
    use serde_json::json;

    const ALL_COLUMNS: &str =
        "account%2Cusername%2Cname%2Cdescription%2Cimage%2Cimage_medium%2Cimage_small%2Ctoken_id";

    fn store(supabase_url: &str) -> PostgrestProfileStore {
        PostgrestProfileStore::new(
            &HttpFactory::default(),
            &supabase_url.parse().unwrap(),
            DEFAULT_PROFILES_TABLE,
            DEFAULT_PROFILE_COLUMNS,
            "service-role-key",
        )
        .unwrap()
    }

    #[test]
    fn builds_upsert_url() {
        let store = store("https://project.supabase.co");
        assert_eq!(
            store.upsert_url("account").unwrap().as_str(),
            format!(
                "https://project.supabase.co/rest/v1/Profiles?on_conflict=account&columns={}",
                ALL_COLUMNS
            )
        );
    }

    #[test]
    fn keeps_supabase_url_path_prefix() {
        let store = store("http://127.0.0.1:54321/proxy");
        assert!(store
            .upsert_url("account")
            .unwrap()
            .as_str()
            .starts_with("http://127.0.0.1:54321/proxy/rest/v1/Profiles?on_conflict=account&"));
    }

    #[test]
    fn skips_blank_columns() {
        let store = PostgrestProfileStore::new(
            &HttpFactory::default(),
            &"https://project.supabase.co".parse().unwrap(),
            "profiles",
            &["account", " name ", ""],
            "key",
        )
        .unwrap();
        assert_eq!(store.columns, "account,name");
    }

    #[test]
    fn writes_with_service_role_and_replaces_rows() {
        let store = store("https://project.supabase.co");
        assert_eq!(
            store.headers(),
            [
                ("apikey", "service-role-key"),
                ("Authorization", "Bearer service-role-key"),
                (
                    "Prefer",
                    "resolution=merge-duplicates,missing=default,return=minimal"
                ),
            ]
        );
    }

    #[test]
    fn sends_full_row_upsert() {
        let (url, server) = serve_once("201 Created", "");
        let store = store(&url);
        let profile = serde_json::from_value(json!({ "account": "0xUser1" })).unwrap();
        let record = ProfileRecord::new(profile, &TokenId("2".to_owned()));

        store.upsert(&record, "account").wait().unwrap();

        let request = server.join().unwrap();
        let (head, body) = request.split_at(request.find("\r\n\r\n").unwrap());
        let head = head.to_lowercase();
        assert!(head.starts_with(&format!(
            "post /rest/v1/profiles?on_conflict=account&columns={} ",
            ALL_COLUMNS.to_lowercase()
        )));
        assert!(head.contains("\r\napikey: service-role-key\r\n"));
        assert!(head.contains("\r\nauthorization: bearer service-role-key\r\n"));
        assert!(head.contains(
            "\r\nprefer: resolution=merge-duplicates,missing=default,return=minimal\r\n"
        ));
        assert_eq!(body.trim(), r#"{"account":"0xUser1","token_id":"2"}"#);
    }

    #[test]
    fn failed_upserts_are_errors() {
        let (url, server) = serve_once("401 Unauthorized", r#"{"message":"Invalid API key"}"#);
        let record = ProfileRecord::new(
            serde_json::from_value(json!({ "account": "0xUser1" })).unwrap(),
            &TokenId("2".to_owned()),
        );

        assert!(store(&url).upsert(&record, "account").wait().is_err());
        server.join().unwrap();
    }

    // Run with `SUPABASE_URL=.. SUPABASE_SERVICE_ROLE_KEY=..
    // cargo test online_postgrest_upsert -- --ignored`.
    #[test]
    #[ignore]
    fn online_postgrest_upsert() {
        let env = |name: &str| std::env::var(name).unwrap();
        let store = PostgrestProfileStore::new(
            &HttpFactory::default(),
            &env("SUPABASE_URL").parse().unwrap(),
            DEFAULT_PROFILES_TABLE,
            DEFAULT_PROFILE_COLUMNS,
            env("SUPABASE_SERVICE_ROLE_KEY"),
        )
        .unwrap();
        let profile = serde_json::from_value(json!({
            "account": "0x0000000000000000000000000000000000000001",
            "username": "test",
            "name": "Test",
        }))
        .unwrap();
        let record = ProfileRecord::new(profile, &TokenId("1".to_owned()));
        store.upsert(&record, "account").wait().unwrap();
    }
}
