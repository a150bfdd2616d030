use url::form_urlencoded;

/// Request parameters from the query string followed by a form body.
/// Keys compare case-insensitively and repeated keys keep their order.
#[derive(Debug, Default, Clone)]
pub struct FormParams {
    pairs: Vec<(String, String)>,
}

impl FormParams {
    pub fn parse(query: Option<&str>, body: &str) -> Self {
        let pairs = query
            .into_iter()
            .chain(std::iter::once(body))
            .flat_map(|raw| form_urlencoded::parse(raw.trim().as_bytes()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    /// First non-empty value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, v)| k.eq_ignore_ascii_case(key) && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    pub fn all(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, v)| k.eq_ignore_ascii_case(key) && !v.is_empty())
            .map(|(_, v)| v.clone())
            .collect()
    }
}
