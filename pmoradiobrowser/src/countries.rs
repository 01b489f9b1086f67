//! Country helpers
//!
//! A short built-in list of popular countries, used to populate a country
//! picker before (or without) the directory's `/countries` listing.

/// Popular countries: ISO 3166-1 alpha-2 code and English name
pub const POPULAR_COUNTRIES: &[(&str, &str)] = &[
    ("TR", "Turkey"),
    ("US", "United States"),
    ("GB", "United Kingdom"),
    ("DE", "Germany"),
    ("FR", "France"),
    ("ES", "Spain"),
    ("IT", "Italy"),
    ("NL", "Netherlands"),
    ("PL", "Poland"),
    ("RU", "Russia"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("AU", "Australia"),
    ("JP", "Japan"),
    ("KR", "South Korea"),
    ("CN", "China"),
    ("IN", "India"),
    ("MX", "Mexico"),
    ("AR", "Argentina"),
    ("SE", "Sweden"),
    ("NO", "Norway"),
    ("DK", "Denmark"),
    ("FI", "Finland"),
    ("CH", "Switzerland"),
    ("AT", "Austria"),
    ("BE", "Belgium"),
    ("GR", "Greece"),
    ("PT", "Portugal"),
    ("CZ", "Czech Republic"),
    ("IE", "Ireland"),
];

/// A country of the built-in list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Country {
    pub code: &'static str,
    pub name: &'static str,
}

impl Country {
    /// Flag emoji of the country
    pub fn flag(&self) -> String {
        flag_emoji(self.code).unwrap_or_default()
    }
}

/// Iterate over the built-in list
pub fn popular_countries() -> impl Iterator<Item = Country> {
    POPULAR_COUNTRIES
        .iter()
        .map(|&(code, name)| Country { code, name })
}

/// Look up a country of the built-in list, case-insensitively
pub fn country_by_code(code: &str) -> Option<Country> {
    popular_countries().find(|c| c.code.eq_ignore_ascii_case(code.trim()))
}

/// Countries whose name or code contains `query`, case-insensitively
pub fn search_countries(query: &str) -> Vec<Country> {
    let query = query.trim().to_lowercase();
    popular_countries()
        .filter(|c| c.name.to_lowercase().contains(&query) || c.code.to_lowercase().contains(&query))
        .collect()
}

/// Flag emoji built from the two regional indicator symbols of `code`
///
/// Returns `None` unless `code` is exactly two ASCII letters.
pub fn flag_emoji(code: &str) -> Option<String> {
    let code = code.trim();
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    code.chars()
        .map(|c| char::from_u32(0x1F1E6 + (c.to_ascii_uppercase() as u32 - 'A' as u32)))
        .collect()
}
