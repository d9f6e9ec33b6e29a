//! Static sura table: names, ayah counts, and global verse ordinals.

extern crate alloc;

use crate::error::MushafError;
use crate::model::{VerseRef, SURA_COUNT, TOTAL_VERSES};

/// Ayah count per sura, in canonical order.
const AYAH_COUNTS: [u16; SURA_COUNT as usize] = [
    7, 286, 200, 176, 120, 165, 206, 75, 129, 109, 123, 111, 43, 52, 99, 128, 111, 110, 98, 135,
    112, 78, 118, 64, 77, 227, 93, 88, 69, 60, 34, 30, 73, 54, 45, 83, 182, 88, 75, 85, 54, 53,
    89, 59, 37, 35, 38, 29, 18, 45, 60, 49, 62, 55, 78, 96, 29, 22, 24, 13, 14, 11, 11, 18, 12,
    12, 30, 52, 52, 44, 28, 28, 20, 56, 40, 31, 50, 40, 46, 42, 29, 19, 36, 25, 22, 17, 19, 26,
    30, 20, 15, 21, 11, 8, 8, 19, 5, 8, 8, 11, 11, 8, 3, 9, 5, 4, 7, 3, 6, 3, 5, 4, 5, 6,
];

/// Arabic sura names, in canonical order.
const SURA_NAMES: [&str; SURA_COUNT as usize] = [
    "الفاتحة", "البقرة", "آل عمران", "النساء", "المائدة", "الأنعام", "الأعراف", "الأنفال",
    "التوبة", "يونس", "هود", "يوسف", "الرعد", "إبراهيم", "الحجر", "النحل", "الإسراء", "الكهف",
    "مريم", "طه", "الأنبياء", "الحج", "المؤمنون", "النور", "الفرقان", "الشعراء", "النمل",
    "القصص", "العنكبوت", "الروم", "لقمان", "السجدة", "الأحزاب", "سبإ", "فاطر", "يس", "الصافات",
    "ص", "الزمر", "غافر", "فصلت", "الشورى", "الزخرف", "الدخان", "الجاثية", "الأحقاف", "محمد",
    "الفتح", "الحجرات", "ق", "الذاريات", "الطور", "النجم", "القمر", "الرحمن", "الواقعة",
    "الحديد", "المجادلة", "الحشر", "الممتحنة", "الصف", "الجمعة", "المنافقون", "التغابن",
    "الطلاق", "التحريم", "الملك", "القلم", "الحاقة", "المعارج", "نوح", "الجن", "المزمل",
    "المدثر", "القيامة", "الإنسان", "المرسلات", "النبإ", "النازعات", "عبس", "التكوير",
    "الانفطار", "المطففين", "الانشقاق", "البروج", "الطارق", "الأعلى", "الغاشية", "الفجر",
    "البلد", "الشمس", "الليل", "الضحى", "الشرح", "التين", "العلق", "القدر", "البينة", "الزلزلة",
    "العاديات", "القارعة", "التكاثر", "العصر", "الهمزة", "الفيل", "قريش", "الماعون", "الكوثر",
    "الكافرون", "النصر", "المسد", "الإخلاص", "الفلق", "الناس",
];

/// Number of ayat in `sura`, or `None` when the sura id is invalid.
pub fn ayah_count(sura: u8) -> Option<u16> {
    if sura == 0 {
        return None;
    }
    AYAH_COUNTS.get(usize::from(sura) - 1).copied()
}

/// Arabic name of `sura`, or `None` when the sura id is invalid.
pub fn sura_name(sura: u8) -> Option<&'static str> {
    if sura == 0 {
        return None;
    }
    SURA_NAMES.get(usize::from(sura) - 1).copied()
}

/// Validate a sura/aya pair against the table.
pub fn validate_reference(sura: i64, aya: i64) -> Result<VerseRef, MushafError> {
    let sura_id = u8::try_from(sura)
        .ok()
        .filter(|s| ayah_count(*s).is_some())
        .ok_or_else(|| {
            MushafError::Lookup(alloc::format!(
                "sura {} is outside 1..={}",
                sura,
                SURA_COUNT
            ))
        })?;
    let count = ayah_count(sura_id).unwrap_or(0);
    match u16::try_from(aya) {
        Ok(aya_id) if aya_id >= 1 && aya_id <= count => Ok(VerseRef::new(sura_id, aya_id)),
        _ => Err(MushafError::Lookup(alloc::format!(
            "aya {} is outside 1..={} for sura {}",
            aya,
            count,
            sura_id
        ))),
    }
}

/// 1-based ordinal of a verse across the whole book.
///
/// Returns `None` for references that do not exist.
pub fn global_verse_index(verse: VerseRef) -> Option<u32> {
    let count = ayah_count(verse.sura)?;
    if verse.aya == 0 || verse.aya > count {
        return None;
    }
    let preceding: u32 = AYAH_COUNTS[..usize::from(verse.sura) - 1]
        .iter()
        .map(|c| u32::from(*c))
        .sum();
    Some(preceding + u32::from(verse.aya))
}

/// Inverse of [`global_verse_index`].
pub fn verse_ref_for_index(index: u32) -> Option<VerseRef> {
    if index == 0 || index > TOTAL_VERSES {
        return None;
    }
    let mut remaining = index;
    for (offset, count) in AYAH_COUNTS.iter().enumerate() {
        let count = u32::from(*count);
        if remaining <= count {
            let sura = u8::try_from(offset + 1).ok()?;
            let aya = u16::try_from(remaining).ok()?;
            return Some(VerseRef::new(sura, aya));
        }
        remaining -= count;
    }
    None
}
