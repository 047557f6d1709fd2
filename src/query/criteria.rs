//! Search criteria and their rendering into the provider's query language

use chrono::NaiveDate;

/// Default search radius for `near:` clauses
pub const DEFAULT_RADIUS_MILES: u32 = 15;

/// A `near:` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearLocation {
    pub place: String,
    pub radius_miles: u32,
}

/// The filter set for one crawl run
///
/// Built once through [`QueryBuilder`] and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    all_of: Vec<String>,
    exact_phrase: Option<String>,
    any_of: Vec<String>,
    hashtags: Vec<String>,
    excluded: Vec<String>,
    from_accounts: Vec<String>,
    to_accounts: Vec<String>,
    mentioning: Vec<String>,
    near: Option<NearLocation>,
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
    language: Option<String>,
}

impl SearchCriteria {
    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn since(&self) -> Option<NaiveDate> {
        self.since
    }

    pub fn until(&self) -> Option<NaiveDate> {
        self.until
    }

    /// Renders the criteria into a single query string
    ///
    /// Clauses appear in a fixed order: AND terms, exact phrase, OR terms,
    /// exclusions, hashtags, `from:`, `to:`, `@` mentions, `near:`,
    /// `since:`, `until:`. Empty clauses are left out.
    ///
    /// # Example
    ///
    /// ```
    /// use post_sweep::query::SearchCriteria;
    ///
    /// let criteria = SearchCriteria::builder()
    ///     .any_of("iphone")
    ///     .any_of("ipad")
    ///     .exclude("android")
    ///     .build();
    /// assert_eq!(criteria.render_query(), "iphone OR ipad -android");
    /// ```
    pub fn render_query(&self) -> String {
        let mut clauses: Vec<String> = Vec::new();

        if !self.all_of.is_empty() {
            clauses.push(self.all_of.join(" "));
        }

        if let Some(phrase) = self.exact_phrase.as_deref().filter(|p| !p.is_empty()) {
            clauses.push(format!("\"{}\"", phrase));
        }

        if !self.any_of.is_empty() {
            clauses.push(self.any_of.join(" OR "));
        }

        if !self.excluded.is_empty() {
            clauses.push(prefixed(&self.excluded, "-", " "));
        }

        if !self.hashtags.is_empty() {
            clauses.push(prefixed(&self.hashtags, "#", " OR "));
        }

        if !self.from_accounts.is_empty() {
            clauses.push(prefixed(&self.from_accounts, "from:", " OR "));
        }

        if !self.to_accounts.is_empty() {
            clauses.push(prefixed(&self.to_accounts, "to:", " OR "));
        }

        if !self.mentioning.is_empty() {
            clauses.push(prefixed(&self.mentioning, "@", " OR "));
        }

        if let Some(near) = &self.near {
            clauses.push(format!(
                "near:\"{}\" within:{}mi",
                near.place, near.radius_miles
            ));
        }

        if let Some(since) = self.since {
            clauses.push(format!("since:{}", since.format("%Y-%m-%d")));
        }

        if let Some(until) = self.until {
            clauses.push(format!("until:{}", until.format("%Y-%m-%d")));
        }

        clauses.join(" ")
    }
}

fn prefixed(items: &[String], prefix: &str, separator: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Pushes `value` unless an equal entry is already present
fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Accumulates search criteria before a crawl starts
///
/// Every method consumes and returns the builder. The finished
/// [`SearchCriteria`] is produced by [`QueryBuilder::build`]. No validation
/// is performed on account names or terms.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    criteria: SearchCriteria,
}

impl QueryBuilder {
    /// Adds a term that every result must contain
    pub fn all_of(mut self, term: impl Into<String>) -> Self {
        self.criteria.all_of.push(term.into());
        self
    }

    /// Adds a term to the OR group
    pub fn any_of(mut self, term: impl Into<String>) -> Self {
        push_unique(&mut self.criteria.any_of, term.into());
        self
    }

    /// Adds a hashtag; pass it without the leading `#`
    pub fn hashtag(mut self, tag: impl Into<String>) -> Self {
        push_unique(&mut self.criteria.hashtags, tag.into());
        self
    }

    pub fn exclude(mut self, term: impl Into<String>) -> Self {
        push_unique(&mut self.criteria.excluded, term.into());
        self
    }

    pub fn from_account(mut self, account: impl Into<String>) -> Self {
        push_unique(&mut self.criteria.from_accounts, account.into());
        self
    }

    pub fn to_account(mut self, account: impl Into<String>) -> Self {
        push_unique(&mut self.criteria.to_accounts, account.into());
        self
    }

    pub fn mentioning(mut self, account: impl Into<String>) -> Self {
        push_unique(&mut self.criteria.mentioning, account.into());
        self
    }

    pub fn exact_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.criteria.exact_phrase = Some(phrase.into());
        self
    }

    /// Restricts results to within 15 miles of `place`
    pub fn near(self, place: impl Into<String>) -> Self {
        self.near_within(place, DEFAULT_RADIUS_MILES)
    }

    pub fn near_within(mut self, place: impl Into<String>, radius_miles: u32) -> Self {
        self.criteria.near = Some(NearLocation {
            place: place.into(),
            radius_miles,
        });
        self
    }

    /// Sets the inclusive lower date bound sent to the provider
    pub fn since(mut self, date: NaiveDate) -> Self {
        self.criteria.since = Some(date);
        self
    }

    /// Sets the upper date bound sent to the provider
    pub fn until(mut self, date: NaiveDate) -> Self {
        self.criteria.until = Some(date);
        self
    }

    pub fn language(mut self, code: impl Into<String>) -> Self {
        self.criteria.language = Some(code.into());
        self
    }

    pub fn build(self) -> SearchCriteria {
        self.criteria
    }
}
