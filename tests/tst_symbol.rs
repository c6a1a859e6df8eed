use options_snapshot::{decode_symbol, encode_symbol, DecodedSymbol, OptionType, SnapshotError};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn assert_malformed(symbol: &str, len: usize) {
        match decode_symbol(symbol, len) {
            Err(SnapshotError::MalformedSymbol { symbol: s, .. }) => assert_eq!(s, symbol),
            other => panic!("expected MalformedSymbol for {}, got {:?}", symbol, other),
        }
    }

    #[test]
    fn test_decode_btc_example() {
        let decoded = decode_symbol("BTC251231150000", 3).unwrap();
        assert_eq!(decoded.underlying, "BTC");
        assert_eq!(decoded.expires, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert_eq!(decoded.price, 150000);
        assert_eq!(decoded.option_type, None);
    }

    #[test]
    fn test_decode_occ_style_with_type_letter() {
        let call = decode_symbol("BTC251231C00150000", 3).unwrap();
        assert_eq!(call.option_type, Some(OptionType::Call));
        assert_eq!(call.price, 150000);

        let put = decode_symbol("SPY260116P00450000", 3).unwrap();
        assert_eq!(put.option_type, Some(OptionType::Put));
        assert_eq!(put.expires, NaiveDate::from_ymd_opt(2026, 1, 16).unwrap());
        assert_eq!(put.price, 450000);
    }

    #[test]
    fn test_round_trip_over_valid_inputs() {
        let tickers = ["X", "BTC", "NVDA", "GOOGL"];
        let dates = [(0, 1, 1), (24, 2, 29), (25, 2, 28), (30, 4, 30), (99, 12, 31)];
        let prices = [0u64, 1, 150000, 4_294_967_296];

        for ticker in tickers {
            for (yy, mm, dd) in dates {
                for price in prices {
                    let original = DecodedSymbol {
                        underlying: ticker.to_string(),
                        expires: NaiveDate::from_ymd_opt(2000 + yy, mm, dd).unwrap(),
                        option_type: None,
                        price,
                    };
                    let symbol = encode_symbol(&original);
                    assert_eq!(decode_symbol(&symbol, ticker.len()).unwrap(), original, "{}", symbol);
                }
            }
        }
    }

    #[test]
    fn test_rejects_non_numeric_price() {
        assert_malformed("BTC2512311500X0", 3);
        assert_malformed("BTC251231abc", 3);
        assert_malformed("BTC251231-5", 3);
    }

    #[test]
    fn test_rejects_missing_price() {
        assert_malformed("BTC251231", 3);
        assert_malformed("BTC251231C", 3);
    }

    #[test]
    fn test_rejects_invalid_calendar_dates() {
        // month 13
        assert_malformed("BTC251331100", 3);
        // Feb 30
        assert_malformed("BTC250230100", 3);
        // Feb 29 in a non-leap year
        assert_malformed("BTC250229100", 3);
        // day 0
        assert_malformed("BTC251200100", 3);
    }

    #[test]
    fn test_rejects_short_or_non_digit_dates() {
        assert_malformed("BTC2512", 3);
        assert_malformed("", 3);
        assert_malformed("BTC25AB31100", 3);
    }

    #[test]
    fn test_underlying_length_shifts_fields() {
        // Same string, different configured ticker length, different meaning
        let decoded = decode_symbol("AB251231150000", 2).unwrap();
        assert_eq!(decoded.underlying, "AB");
        assert_eq!(decoded.expires, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert!(decode_symbol("AB251231150000", 3).is_err());
    }
}
