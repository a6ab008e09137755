//! Tag query parsing and sort keys

/// Parsed tag search: tags every result must carry and tags none may carry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagQuery {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl TagQuery {
    /// Parse a free-text query
    ///
    /// Input is lower-cased and split on whitespace. A leading `-` marks an
    /// exclusion; a bare `-` is ignored. Repeated terms collapse.
    pub fn parse(input: &str) -> Self {
        let mut query = TagQuery::default();

        for term in input.to_lowercase().split_whitespace() {
            let (list, name) = match term.strip_prefix('-') {
                Some(rest) => (&mut query.exclude, rest),
                None => (&mut query.include, term),
            };
            if name.is_empty() {
                continue;
            }
            if !list.iter().any(|t| t == name) {
                list.push(name.to_string());
            }
        }

        query
    }

    /// True when the query has no terms; an empty query matches nothing
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// Result ordering for listings and searches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Upload time, newest first
    #[default]
    Recent,
    Oldest,
    SizeDesc,
    SizeAsc,
    /// MIME type ascending
    Type,
    Name,
    NameDesc,
}

impl SortKey {
    /// Parse a sort key; unknown or missing keys fall back to `Recent`
    pub fn parse(key: Option<&str>) -> Self {
        match key.map(str::trim) {
            Some("oldest") => SortKey::Oldest,
            Some("size_desc") => SortKey::SizeDesc,
            Some("size_asc") => SortKey::SizeAsc,
            Some("type") => SortKey::Type,
            Some("name") => SortKey::Name,
            Some("name_desc") => SortKey::NameDesc,
            _ => SortKey::Recent,
        }
    }

    /// ORDER BY clause over the `files` table aliased as `f`
    ///
    /// Every ordering ends on `f.id DESC` so results are deterministic.
    pub fn order_by_sql(self) -> &'static str {
        match self {
            SortKey::Recent => "f.uploaded_at DESC, f.id DESC",
            SortKey::Oldest => "f.uploaded_at ASC, f.id DESC",
            SortKey::SizeDesc => "f.size_bytes DESC, f.id DESC",
            SortKey::SizeAsc => "f.size_bytes ASC, f.id DESC",
            SortKey::Type => "f.mime_type ASC, f.id DESC",
            SortKey::Name => "f.name ASC, f.id DESC",
            SortKey::NameDesc => "f.name DESC, f.id DESC",
        }
    }
}

/// Escape `%`, `_` and `\` so user text matches literally in `LIKE ... ESCAPE '\'`
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
