use crate::models::AlertRecord;

pub const KEY_DELIMITER: &str = "|";

/// Derives the key an alert keeps across cycles and across zone queries.
///
/// The upstream `id` differs between zone queries of the same warning, so it is
/// deliberately left out. Fields are joined unescaped: a headline containing the
/// delimiter can collide with another field split, which the feed does not
/// produce in practice.
pub fn build_key(record: &AlertRecord) -> String {
    [
        record.event.as_deref(),
        record.onset.as_deref(),
        record.expires.as_deref(),
        record.sender_name.as_deref(),
        record.headline.as_deref(),
    ]
    .map(Option::unwrap_or_default)
    .join(KEY_DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tornado_warning(id: &str) -> AlertRecord {
        AlertRecord {
            id: Some(id.to_owned()),
            event: Some("Tornado Warning".to_owned()),
            onset: Some("2025-05-06T14:00:00-05:00".to_owned()),
            expires: Some("2025-05-06T15:00:00-05:00".to_owned()),
            sender_name: Some("NWS Northern Indiana".to_owned()),
            headline: Some("Tornado Warning issued May 6".to_owned()),
            area_desc: Some("Elkhart".to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn same_episode_from_different_zones_shares_a_key() {
        let from_first_zone = tornado_warning("urn:oid:2.49.0.1.840.0.aaa");
        let mut from_second_zone = tornado_warning("urn:oid:2.49.0.1.840.0.bbb");
        from_second_zone.area_desc = Some("St. Joseph".to_owned());
        from_second_zone.description = Some("different wording".to_owned());

        assert_eq!(build_key(&from_first_zone), build_key(&from_second_zone));
    }

    #[test]
    fn extended_expiry_yields_a_new_key() {
        let original = tornado_warning("a");
        let mut extended = tornado_warning("a");
        extended.expires = Some("2025-05-06T15:45:00-05:00".to_owned());

        assert_ne!(build_key(&original), build_key(&extended));
    }

    #[test]
    fn missing_fields_are_empty_components() {
        let record = AlertRecord {
            event: Some("Flood Watch".to_owned()),
            headline: Some("h".to_owned()),
            ..Default::default()
        };

        assert_eq!(build_key(&record), "Flood Watch||||h");
    }
}
