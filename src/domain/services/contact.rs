use crate::domain::model::ContactInfo;

const UNKNOWN: &str = "Unknown";

impl ContactInfo {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN.to_string(),
            address: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
            region: UNKNOWN.to_string(),
        }
    }
}

/// 解析聯絡資訊字串
///
/// Expects `name, street, city, ..., region, <last>`. The region is the
/// second-to-last piece, so a trailing postal code is skipped. Anything with
/// fewer than four comma-separated pieces resolves to `Unknown` for every
/// field.
pub fn parse_contact(contact: &str) -> ContactInfo {
    if !contact.contains(',') {
        return ContactInfo::unknown();
    }

    let parts: Vec<&str> = contact.split(',').map(str::trim).collect();
    if parts.len() < 4 {
        return ContactInfo::unknown();
    }

    let street = parts[1];
    let city = parts[2];

    ContactInfo {
        name: parts[0].to_string(),
        address: format!("{}, {}", street, city),
        city: city.to_string(),
        region: parts[parts.len() - 2].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_contact() {
        let info = parse_contact("Jane Doe, 123 Main St, Springfield, IL, 62704");
        assert_eq!(info.name, "Jane Doe");
        assert_eq!(info.address, "123 Main St, Springfield");
        assert_eq!(info.city, "Springfield");
        assert_eq!(info.region, "IL");
    }

    #[test]
    fn test_four_parts_uses_third_as_region() {
        let info = parse_contact("Bob,1 Elm Rd,Austin,TX");
        assert_eq!(info.city, "Austin");
        // 第二個到最後一個
        assert_eq!(info.region, "Austin");
        assert_eq!(info.address, "1 Elm Rd, Austin");
    }

    #[test]
    fn test_no_comma_is_unknown() {
        assert_eq!(parse_contact("no commas here"), ContactInfo::unknown());
        assert_eq!(parse_contact(""), ContactInfo::unknown());
    }

    #[test]
    fn test_too_few_parts_is_unknown() {
        assert_eq!(parse_contact("Jane, Main St, Springfield"), ContactInfo::unknown());
    }

    #[test]
    fn test_empty_name_is_kept_empty() {
        let info = parse_contact(" , 9 Oak Ave, Dallas, TX, 75001");
        assert_eq!(info.name, "");
        assert_eq!(info.region, "TX");
    }
}
