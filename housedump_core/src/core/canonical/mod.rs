use crate::{
    NEW_TAIPEI,
    core::{
        record::{Column, Record},
        scalar::Scalar,
    },
};

pub mod clean;
pub mod geo;
pub mod usage;

use clean::clean_scalar;
use geo::{canonical_city, canonical_district, is_new_taipei_district};
use usage::canonical_usage;

/// Normalizes city, district and usage of one record in place.
///
/// Running it twice gives the same record as running it once.
pub fn canonicalize(record: &mut Record) {
    let city = map_text(clean_scalar(record.get(Column::City)), |city| {
        canonical_city(city).map(str::to_string)
    });
    let district = map_text(clean_scalar(record.get(Column::District)), |district| {
        Some(canonical_district(district))
    });
    let usage = map_text(clean_scalar(record.get(Column::Usage)), |usage| {
        canonical_usage(usage).map(str::to_string)
    });

    let forces_city = district
        .as_text()
        .is_some_and(is_new_taipei_district);

    record.set(Column::City, if forces_city { Scalar::from(NEW_TAIPEI) } else { city });
    record.set(Column::District, district);
    record.set(Column::Usage, usage);
}

pub fn canonicalize_all(records: &mut [Record]) {
    records.iter_mut().for_each(canonicalize);
}

// Replaces text with `f`'s answer when there is one; anything else stays.
fn map_text(value: Scalar, f: impl FnOnce(&str) -> Option<String>) -> Scalar {
    match value {
        Scalar::Text(text) => match f(&text) {
            Some(mapped) => Scalar::Text(mapped),
            None => Scalar::Text(text),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::COLUMN_COUNT;

    fn record(city: Scalar, district: Scalar, usage: Scalar) -> Record {
        let mut values: [Scalar; COLUMN_COUNT] = Default::default();
        values[Column::City.index()] = city;
        values[Column::District.index()] = district;
        values[Column::Usage.index()] = usage;
        Record::new(values)
    }

    fn text(value: &str) -> Scalar {
        Scalar::from(value)
    }

    #[test]
    fn test_full_record() {
        let mut r = record(text("\u{FEFF}新北市 "), text("banqiao district"), text("住宅"));
        canonicalize(&mut r);
        assert_eq!(r.city(), Some(NEW_TAIPEI));
        assert_eq!(r.district(), Some("板橋區"));
        assert_eq!(r.usage(), Some("住家用"));
        assert_eq!(r.district_raw, text("banqiao district"));
    }

    #[test]
    fn test_known_district_forces_city() {
        let mut r = record(Scalar::Null, text("永和"), Scalar::Null);
        canonicalize(&mut r);
        assert_eq!(r.city(), Some(NEW_TAIPEI));

        let mut r = record(text("臺北市"), text("大安區"), Scalar::Null);
        canonicalize(&mut r);
        assert_eq!(r.city(), Some("臺北市"));
        assert_eq!(r.district(), Some("大安區"));
    }

    #[test]
    fn test_blank_values_become_null() {
        let mut r = record(text("\u{3000}"), text(" \u{200B} "), text(""));
        canonicalize(&mut r);
        assert!(r.get(Column::City).is_null());
        assert!(r.get(Column::District).is_null());
        assert!(r.get(Column::Usage).is_null());
    }

    #[test]
    fn test_numbers_are_left_alone() {
        let mut r = record(Scalar::Number(1.0), Scalar::Number(2.0), Scalar::Number(3.0));
        canonicalize(&mut r);
        assert_eq!(r.get(Column::City), &Scalar::Number(1.0));
        assert_eq!(r.get(Column::District), &Scalar::Number(2.0));
        assert_eq!(r.get(Column::Usage), &Scalar::Number(3.0));
    }

    #[test]
    fn test_all_districts_in_every_spelling() {
        for district in geo::NEW_TAIPEI_DISTRICTS {
            let base = district.trim_end_matches(geo::DISTRICT_SUFFIX);
            let romanized = geo_romanized(district);
            for spelling in [district.to_string(), base.to_string(), romanized] {
                let mut r = record(Scalar::Null, text(&spelling), text("住家用"));
                canonicalize(&mut r);
                assert_eq!(r.district(), Some(district), "spelling {}", spelling);
                assert_eq!(r.city(), Some(NEW_TAIPEI));
            }
        }
    }

    // One romanized spelling per district, written the way exports spell them.
    fn geo_romanized(district: &str) -> String {
        let name = match district {
            "板橋區" => "Banqiao", "三重區" => "Sanchong", "中和區" => "Zhonghe",
            "永和區" => "Yonghe", "新莊區" => "Xinzhuang", "新店區" => "Xindian",
            "樹林區" => "Shulin", "鶯歌區" => "Yingge", "三峽區" => "Sanxia",
            "淡水區" => "Tamsui", "汐止區" => "Xizhi", "瑞芳區" => "Ruifang",
            "土城區" => "Tucheng", "蘆洲區" => "Luzhou", "五股區" => "Wugu",
            "泰山區" => "Taishan", "林口區" => "Linkou", "深坑區" => "Shenkeng",
            "石碇區" => "Shiding", "坪林區" => "Pinglin", "三芝區" => "Sanzhi",
            "石門區" => "Shimen", "八里區" => "Bali", "平溪區" => "Pingxi",
            "雙溪區" => "Shuangxi", "貢寮區" => "Gongliao", "金山區" => "Jinshan",
            "萬里區" => "Wanli", "烏來區" => "Wulai",
            other => panic!("unexpected district {}", other),
        };
        format!("{} District", name)
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            ("新北", "新北市板橋區", "住宅"),
            ("New Taipei", "Xindian", "商办"),
            ("臺北市", "中正区", "工業用"),
            ("", "Daan District", "辦公"),
            ("台北縣", "鶯歌鎮", "\u{3000}"),
            ("x", "市", "住家"),
        ];
        for (city, district, usage) in samples {
            let mut once = record(text(city), text(district), text(usage));
            canonicalize(&mut once);
            let mut twice = once.clone();
            canonicalize(&mut twice);
            assert_eq!(once, twice);
        }
    }
}
