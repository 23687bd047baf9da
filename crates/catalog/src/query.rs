//! Structured product query: field predicates, text search, ordering.
//!
//! The same [`ProductQuery`] is evaluated in memory ([`ProductQuery::apply`])
//! and translated to SQL by the Postgres store, so both backends agree on
//! semantics.

use core::cmp::Ordering as CmpOrdering;
use core::str::FromStr;

use rust_decimal::Decimal;

use storefront_core::{DomainError, DomainResult};

use crate::Product;

/// Comparison operator of a field predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    /// Parse a lookup suffix (`price__gte` → `"gte"`). No suffix means `Eq`.
    fn from_lookup(lookup: Option<&str>) -> Option<Self> {
        match lookup {
            None | Some("exact") => Some(Self::Eq),
            Some("gt") => Some(Self::Gt),
            Some("gte") => Some(Self::Gte),
            Some("lt") => Some(Self::Lt),
            Some("lte") => Some(Self::Lte),
            Some(_) => None,
        }
    }

    pub fn sql_operator(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

/// `field <op> value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predicate<T> {
    pub op: Comparison,
    pub value: T,
}

impl<T: PartialOrd> Predicate<T> {
    pub fn new(op: Comparison, value: T) -> Self {
        Self { op, value }
    }

    pub fn matches(&self, candidate: &T) -> bool {
        match self.op {
            Comparison::Eq => candidate == &self.value,
            Comparison::Gt => candidate > &self.value,
            Comparison::Gte => candidate >= &self.value,
            Comparison::Lt => candidate < &self.value,
            Comparison::Lte => candidate <= &self.value,
        }
    }
}

/// A filter on one of the filterable product fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductFilter {
    Price(Predicate<Decimal>),
    Stock(Predicate<i32>),
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            Self::Price(p) => p.matches(&product.price),
            Self::Stock(p) => p.matches(&product.stock),
        }
    }
}

/// Fields a product listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    Price,
    CreatedAt,
}

impl OrderField {
    pub fn column(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::CreatedAt => "created_at",
        }
    }
}

impl FromStr for OrderField {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price" => Ok(Self::Price),
            "created_at" => Ok(Self::CreatedAt),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub field: OrderField,
    pub descending: bool,
}

impl Ordering {
    pub fn asc(field: OrderField) -> Self {
        Self { field, descending: false }
    }

    pub fn desc(field: OrderField) -> Self {
        Self { field, descending: true }
    }

    fn compare(&self, a: &Product, b: &Product) -> CmpOrdering {
        let ord = match self.field {
            OrderField::Price => a.price.cmp(&b.price),
            OrderField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        if self.descending { ord.reverse() } else { ord }
    }
}

/// A product listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub filters: Vec<ProductFilter>,
    /// Lowercased search terms; every term must match name or description.
    pub search_terms: Vec<String>,
    /// Explicit ordering; listings always fall back to `created_at`, then id.
    pub ordering: Vec<Ordering>,
}

impl ProductQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: ProductFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn search(mut self, text: &str) -> Self {
        self.search_terms = split_terms(text);
        self
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.ordering.push(ordering);
        self
    }

    /// Build a query from raw query-string pairs.
    ///
    /// Recognized keys: `price`, `stock` (optionally suffixed with `__gt`,
    /// `__gte`, `__lt`, `__lte`, `__exact`), `search`, `ordering`. Unknown keys
    /// and empty values are ignored; unparsable filter values are rejected.
    pub fn from_params<'a, I>(params: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut query = Self::new();

        for (key, value) in params {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key {
                "search" => query.search_terms.extend(split_terms(value)),
                "ordering" => query.ordering.extend(parse_ordering(value)),
                _ => {
                    let (field, lookup) = match key.split_once("__") {
                        Some((f, l)) => (f, Some(l)),
                        None => (key, None),
                    };
                    let filter = match field {
                        "price" => {
                            let op = lookup_op(key, lookup)?;
                            let v = Decimal::from_str(value).map_err(|_| {
                                DomainError::validation(format!("{key}: '{value}' is not a decimal"))
                            })?;
                            ProductFilter::Price(Predicate::new(op, v))
                        }
                        "stock" => {
                            let op = lookup_op(key, lookup)?;
                            let v = value.parse::<i32>().map_err(|_| {
                                DomainError::validation(format!("{key}: '{value}' is not an integer"))
                            })?;
                            ProductFilter::Stock(Predicate::new(op, v))
                        }
                        _ => continue,
                    };
                    query.filters.push(filter);
                }
            }
        }

        Ok(query)
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.filters.iter().all(|f| f.matches(product)) && self.matches_search(product)
    }

    fn matches_search(&self, product: &Product) -> bool {
        if self.search_terms.is_empty() {
            return true;
        }
        let name = product.name.to_lowercase();
        let description = product.description.to_lowercase();
        self.search_terms
            .iter()
            .all(|t| name.contains(t.as_str()) || description.contains(t.as_str()))
    }

    /// Total order used for listings: explicit orderings, then `created_at`,
    /// then id.
    pub fn compare(&self, a: &Product, b: &Product) -> CmpOrdering {
        self.ordering
            .iter()
            .map(|o| o.compare(a, b))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
    }

    /// Filter and sort an in-memory product set.
    pub fn apply(&self, products: impl IntoIterator<Item = Product>) -> Vec<Product> {
        let mut out: Vec<Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        out.sort_by(|a, b| self.compare(a, b));
        out
    }
}

fn lookup_op(key: &str, lookup: Option<&str>) -> DomainResult<Comparison> {
    Comparison::from_lookup(lookup)
        .ok_or_else(|| DomainError::validation(format!("unsupported lookup '{key}'")))
}

/// Terms are separated by whitespace and/or commas.
fn split_terms(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn parse_ordering(value: &str) -> Vec<Ordering> {
    value
        .split(',')
        .map(str::trim)
        .filter_map(|raw| {
            let (descending, name) = match raw.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, raw),
            };
            name.parse::<OrderField>()
                .ok()
                .map(|field| Ordering { field, descending })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use storefront_core::ProductId;

    fn product(name: &str, description: &str, cents: i64, stock: i32, age_days: i64) -> Product {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Product {
            id: ProductId::new(),
            name: name.to_string(),
            description: description.to_string(),
            price: Decimal::new(cents, 2),
            stock,
            category_id: None,
            created_at: base + Duration::days(age_days),
        }
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    fn catalog() -> Vec<Product> {
        vec![
            product("Trail Runner", "grippy sole for mud", 8999, 4, 2),
            product("Road Runner", "light and fast", 12000, 0, 1),
            product("Wool Sock", "warm trail companion", 1500, 40, 3),
        ]
    }

    #[test]
    fn default_order_is_created_at_ascending() {
        let out = ProductQuery::new().apply(catalog());
        assert_eq!(names(&out), ["Road Runner", "Trail Runner", "Wool Sock"]);
    }

    #[test]
    fn exact_price_filter_from_params() {
        let q = ProductQuery::from_params([("price", "15.00")]).unwrap();
        assert_eq!(names(&q.apply(catalog())), ["Wool Sock"]);
    }

    #[test]
    fn range_lookups_are_anded() {
        let q = ProductQuery::from_params([("price__gte", "20"), ("price__lt", "120")]).unwrap();
        assert_eq!(names(&q.apply(catalog())), ["Trail Runner"]);
    }

    #[test]
    fn stock_zero_filter() {
        let q = ProductQuery::from_params([("stock", "0")]).unwrap();
        assert_eq!(names(&q.apply(catalog())), ["Road Runner"]);
    }

    #[test]
    fn search_terms_must_all_match_some_field() {
        let q = ProductQuery::from_params([("search", "TRAIL warm")]).unwrap();
        assert_eq!(names(&q.apply(catalog())), ["Wool Sock"]);

        let q = ProductQuery::from_params([("search", "trail")]).unwrap();
        assert_eq!(names(&q.apply(catalog())), ["Trail Runner", "Wool Sock"]);
    }

    #[test]
    fn commas_separate_search_terms() {
        let q = ProductQuery::from_params([("search", "runner,trail")]).unwrap();
        assert_eq!(q.search_terms, ["runner", "trail"]);
        assert_eq!(names(&q.apply(catalog())), ["Trail Runner"]);

        let q = ProductQuery::new().search(" ,warm, ");
        assert_eq!(q.search_terms, ["warm"]);
    }

    #[test]
    fn descending_price_ordering() {
        let q = ProductQuery::from_params([("ordering", "-price")]).unwrap();
        assert_eq!(names(&q.apply(catalog())), ["Road Runner", "Trail Runner", "Wool Sock"]);
    }

    #[test]
    fn unknown_ordering_fields_are_ignored() {
        let q = ProductQuery::from_params([("ordering", "name,-created_at")]).unwrap();
        assert_eq!(q.ordering, vec![Ordering::desc(OrderField::CreatedAt)]);
    }

    #[test]
    fn unknown_params_and_empty_values_are_ignored() {
        let q = ProductQuery::from_params([("page", "2"), ("price", ""), ("name", "x")]).unwrap();
        assert_eq!(q, ProductQuery::new());
    }

    #[test]
    fn bad_filter_value_is_validation_error() {
        let err = ProductQuery::from_params([("stock__gte", "lots")]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn unsupported_lookup_is_validation_error() {
        let err = ProductQuery::from_params([("price__icontains", "1")]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: results satisfy every filter and respect the requested order.
        #[test]
        fn results_are_filtered_and_sorted(
            prices in prop::collection::vec(0i64..50_000i64, 0..20),
            floor in 0i64..50_000i64,
        ) {
            let products: Vec<Product> = prices
                .iter()
                .enumerate()
                .map(|(i, c)| product(&format!("p{i}"), "", *c, 1, i as i64))
                .collect();

            let floor = Decimal::new(floor, 2);
            let q = ProductQuery::new()
                .filter(ProductFilter::Price(Predicate::new(Comparison::Gte, floor)))
                .order_by(Ordering::asc(OrderField::Price));

            let out = q.apply(products.clone());

            prop_assert!(out.iter().all(|p| p.price >= floor));
            prop_assert!(out.windows(2).all(|w| w[0].price <= w[1].price));
            prop_assert_eq!(out.len(), products.iter().filter(|p| p.price >= floor).count());
        }
    }
}
