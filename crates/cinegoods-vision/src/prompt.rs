//! The extraction instruction sent with every screenshot.

use cinegoods_core::{Cinema, ALL_LOCATIONS, GENERAL_MOVIE};

/// Instruction block asking for exactly `movieTitle`, `goodsKind` and
/// `locations`. `{cinema}` is replaced with the chain's display name,
/// `{general}` and `{all}` with the sentinels downstream code matches on.
const EXTRACTION_PROMPT: &str = r#"
당신은 영화관 이벤트 페이지에서 정보를 추출하는 전문가입니다.
제공된 {cinema} 이벤트 상세 페이지 이미지를 분석해주세요.

이미지에서 다음 정보를 정확히 추출해야 합니다:

1. "movieTitle" (영화 제목):
   - 특정 영화와 관련된 이벤트인 경우, 이미지에 표시된 정확한 영화 제목을 추출하세요.
   - 영화와 관련 없는 일반 이벤트인 경우 "{general}"을 사용하세요.
   - 예시: "듄: 파트 2", "웡카", "{general}"

2. "goodsKind" (상품 종류):
   - 제공되는 상품의 종류를 추출하세요.
   - 가능한 값: "오리지널 티켓", "TTT", "포스터", "배지", "포스트카드", "스티커", "포토카드", "키링" 등
   - 여러 종류가 있으면 쉼표로 구분하여 결합하세요 (예: "포스터, 배지")
   - 이미지에서 정확히 확인할 수 없는 경우 "unknown"을 사용하세요.

3. "locations" (지점 정보):
   - 이벤트가 진행되는 지점을 추출하세요.
   - "전국", "전 지점", "모든 지점" 등의 표현이 있으면 ["{all}"]을 반환하세요.
   - 특정 지점이 나열되어 있으면 모든 지점을 배열로 추출하세요 (예: ["용산아이파크몰", "코엑스", "강남"]).
   - 지점 정보가 없는 경우 빈 배열 []을 반환하세요.

중요 사항:
- 이미지의 텍스트는 한국어입니다.
- 추출할 수 없는 정보는 빈 문자열("") 또는 빈 배열([])로 반환하세요.
- 반드시 아래 JSON 형식으로만 응답하세요. 다른 설명이나 텍스트는 포함하지 마세요.

응답 형식 (JSON만):
{
  "movieTitle": "영화 제목 또는 {general}",
  "goodsKind": "상품 종류",
  "locations": ["지점1", "지점2"] 또는 ["{all}"] 또는 []
}
"#;

#[must_use]
pub fn extraction_prompt(cinema: Cinema) -> String {
    EXTRACTION_PROMPT
        .replace("{cinema}", cinema.display_name())
        .replace("{general}", GENERAL_MOVIE)
        .replace("{all}", ALL_LOCATIONS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_the_chain_and_all_three_fields() {
        let prompt = extraction_prompt(Cinema::Megabox);
        assert!(prompt.contains("제공된 메가박스 이벤트"));
        for field in ["\"movieTitle\"", "\"goodsKind\"", "\"locations\""] {
            assert!(prompt.contains(field), "missing {field}");
        }
        assert!(!prompt.contains("{cinema}"));
    }

    #[test]
    fn prompt_spells_out_the_sentinels() {
        let prompt = extraction_prompt(Cinema::Cgv);
        assert!(prompt.contains(&format!("\"{GENERAL_MOVIE}\"을 사용하세요")));
        assert!(prompt.contains(&format!("[\"{ALL_LOCATIONS}\"]을 반환하세요")));
        assert!(!prompt.contains("{general}"));
        assert!(!prompt.contains("{all}"));
    }
}
