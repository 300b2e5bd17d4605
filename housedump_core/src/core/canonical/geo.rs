use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;

use crate::NEW_TAIPEI;

use super::clean::{is_cjk, romanized_key};

/// The 29 districts of New Taipei, in canonical `<base>區` form.
pub const NEW_TAIPEI_DISTRICTS: [&str; 29] = [
    "板橋區", "三重區", "中和區", "永和區", "新莊區", "新店區", "樹林區", "鶯歌區", "三峽區",
    "淡水區", "汐止區", "瑞芳區", "土城區", "蘆洲區", "五股區", "泰山區", "林口區", "深坑區",
    "石碇區", "坪林區", "三芝區", "石門區", "八里區", "平溪區", "雙溪區", "貢寮區", "金山區",
    "萬里區", "烏來區",
];

pub const DISTRICT_SUFFIX: char = '區';

const ADMIN_SUFFIXES: [char; 7] = ['區', '区', '鎮', '镇', '鄉', '乡', '市'];

// Checked in order, longest first.
const CITY_PREFIXES: [&str; 4] = ["新北市", "臺北縣", "台北縣", "新北"];

static DISTRICT_SET: Lazy<AHashSet<&'static str>> =
    Lazy::new(|| NEW_TAIPEI_DISTRICTS.into_iter().collect());

// Base name (no suffix) -> canonical district, simplified spellings included.
static DISTRICT_BASES: Lazy<AHashMap<String, &'static str>> = Lazy::new(|| {
    let mut bases: AHashMap<String, &'static str> = NEW_TAIPEI_DISTRICTS
        .into_iter()
        .map(|district| (district.trim_end_matches(DISTRICT_SUFFIX).to_string(), district))
        .collect();

    let simplified = [
        ("板桥", "板橋區"),
        ("新庄", "新莊區"),
        ("树林", "樹林區"),
        ("莺歌", "鶯歌區"),
        ("三峡", "三峽區"),
        ("芦洲", "蘆洲區"),
        ("石门", "石門區"),
        ("双溪", "雙溪區"),
        ("贡寮", "貢寮區"),
        ("万里", "萬里區"),
        ("乌来", "烏來區"),
    ];
    for (base, district) in simplified {
        bases.insert(base.to_string(), district);
    }
    bases
});

// Romanized keys, as produced by `romanized_key`. Hanyu pinyin first, then
// Tongyong / Wade-Giles spellings still found on older records.
static ROMANIZED_DISTRICTS: Lazy<AHashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("banqiao", "板橋區"),
        ("sanchong", "三重區"),
        ("zhonghe", "中和區"),
        ("yonghe", "永和區"),
        ("xinzhuang", "新莊區"),
        ("xindian", "新店區"),
        ("shulin", "樹林區"),
        ("yingge", "鶯歌區"),
        ("sanxia", "三峽區"),
        ("tamsui", "淡水區"),
        ("danshui", "淡水區"),
        ("xizhi", "汐止區"),
        ("ruifang", "瑞芳區"),
        ("tucheng", "土城區"),
        ("luzhou", "蘆洲區"),
        ("wugu", "五股區"),
        ("taishan", "泰山區"),
        ("linkou", "林口區"),
        ("shenkeng", "深坑區"),
        ("shiding", "石碇區"),
        ("pinglin", "坪林區"),
        ("sanzhi", "三芝區"),
        ("shimen", "石門區"),
        ("bali", "八里區"),
        ("pingxi", "平溪區"),
        ("shuangxi", "雙溪區"),
        ("gongliao", "貢寮區"),
        ("jinshan", "金山區"),
        ("wanli", "萬里區"),
        ("wulai", "烏來區"),
        ("banciao", "板橋區"),
        ("jhonghe", "中和區"),
        ("sinjhuang", "新莊區"),
        ("sindian", "新店區"),
        ("sansia", "三峽區"),
        ("danshuei", "淡水區"),
        ("sijhih", "汐止區"),
        ("lujhou", "蘆洲區"),
        ("shihding", "石碇區"),
        ("sanjhih", "三芝區"),
        ("shihmen", "石門區"),
        ("pingsi", "平溪區"),
        ("shuangsi", "雙溪區"),
    ]
    .into_iter()
    .collect()
});

static CITY_ALIASES: Lazy<AHashSet<&'static str>> =
    Lazy::new(|| ["新北市", "新北", "新北縣"].into_iter().collect());

static ROMANIZED_CITY_KEYS: Lazy<AHashSet<&'static str>> =
    Lazy::new(|| ["newtaipei", "newtaipeicity", "newtaipecity"].into_iter().collect());

pub fn is_new_taipei_district(district: &str) -> bool {
    DISTRICT_SET.contains(district)
}

/// Canonical city token for a cleaned city string, when it is a known alias.
pub fn canonical_city(city: &str) -> Option<&'static str> {
    if CITY_ALIASES.contains(city) || ROMANIZED_CITY_KEYS.contains(romanized_key(city).as_str()) {
        Some(NEW_TAIPEI)
    } else {
        None
    }
}

/// Canonical district name for a cleaned, non-empty district string.
///
/// Names written in Chinese keep only their CJK characters and are brought to
/// `<base>區`. Romanized names go through the spelling table and are returned
/// unchanged when they are not in it.
pub fn canonical_district(district: &str) -> String {
    let cjk: String = district.chars().filter(|c| is_cjk(*c)).collect();
    if cjk.is_empty() {
        return romanized_district(district)
            .map(str::to_string)
            .unwrap_or_else(|| district.to_string());
    }

    let base = strip_admin_suffix(&cjk);
    if let Some(known) = resolve_base(base) {
        return known.to_string();
    }

    match cjk.strip_suffix('区') {
        Some(head) => format!("{}{}", head, DISTRICT_SUFFIX),
        None if cjk.ends_with(DISTRICT_SUFFIX) => cjk,
        None => format!("{}{}", cjk, DISTRICT_SUFFIX),
    }
}

fn strip_admin_suffix(name: &str) -> &str {
    match name.chars().next_back() {
        Some(last) if ADMIN_SUFFIXES.contains(&last) => &name[..name.len() - last.len_utf8()],
        _ => name,
    }
}

fn resolve_base(base: &str) -> Option<&'static str> {
    if let Some(district) = DISTRICT_BASES.get(base) {
        return Some(*district);
    }
    // 新北市板橋區 and friends
    CITY_PREFIXES
        .iter()
        .filter_map(|prefix| base.strip_prefix(prefix))
        .find_map(|rest| DISTRICT_BASES.get(strip_admin_suffix(rest)).copied())
}

fn romanized_district(district: &str) -> Option<&'static str> {
    let key = romanized_key(district);
    ROMANIZED_DISTRICTS.get(key.as_str()).copied().or_else(|| {
        key.strip_suffix("district")
            .and_then(|base| ROMANIZED_DISTRICTS.get(base).copied())
    })
}
