//! Deterministic product dataset

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Draft,
    Published,
}

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub gtin: String,
    pub name: String,
    pub status: Status,
    pub has_packshot: bool,
}

const STYLES: [&str; 7] = [
    "KATANA", "NORDIC", "URBAN", "SKATE", "VINTAGE", "ALPINE", "Kathmandu",
];
const ITEMS: [&str; 6] = ["CHAIR", "LAMP", "DESK", "SHELF", "SOFA", "RUG"];
const GTIN_BASE: u64 = 3_760_123_400_000;

/// Build `count` products
///
/// Every fourth product is a draft and two in three carry a packshot, so the
/// draft filter and the packshot filter each narrow the listing further.
pub fn generate_catalog(count: usize) -> Vec<Product> {
    (0..count)
        .map(|i| Product {
            gtin: format!("{:013}", GTIN_BASE + i as u64 * 7),
            name: format!(
                "{} {} {:04}",
                STYLES[i % STYLES.len()],
                ITEMS[(i / STYLES.len()) % ITEMS.len()],
                i
            ),
            status: if i % 4 == 0 { Status::Draft } else { Status::Published },
            has_packshot: i % 3 != 0,
        })
        .collect()
}

/// Render a result count the way the pagination label does ("1,204 résultats")
pub fn format_total(count: usize) -> String {
    let digits = count.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let noun = if count == 1 { "résultat" } else { "résultats" };
    format!("{} {}", grouped, noun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, "0 résultats")]
    #[test_case(1, "1 résultat")]
    #[test_case(312, "312 résultats")]
    #[test_case(1204, "1,204 résultats")]
    #[test_case(1234567, "1,234,567 résultats")]
    fn test_format_total(count: usize, expected: &str) {
        assert_eq!(format_total(count), expected);
    }

    #[test]
    fn test_catalog_shape() {
        let products = generate_catalog(1204);
        assert_eq!(products.len(), 1204);
        assert!(products.iter().all(|p| p.gtin.len() == 13));

        let drafts = products.iter().filter(|p| p.status == Status::Draft).count();
        assert_eq!(drafts, 301);

        let drafts_with_packshot = products
            .iter()
            .filter(|p| p.status == Status::Draft && p.has_packshot)
            .count();
        assert_eq!(drafts_with_packshot, 200);
    }

    #[test]
    fn test_gtins_are_unique() {
        let products = generate_catalog(500);
        let mut gtins: Vec<&str> = products.iter().map(|p| p.gtin.as_str()).collect();
        gtins.sort_unstable();
        gtins.dedup();
        assert_eq!(gtins.len(), 500);
    }
}
