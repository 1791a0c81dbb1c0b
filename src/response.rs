//! Uniform JSON envelope returned by every API endpoint.

use serde::Serialize;

/// `{"success": bool, "data": T | null, "message": "..."}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload.
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
        }
    }
}

/// One page of records plus paging arithmetic.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData<T> {
    pub records: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_page: i64,
}

impl<T> PageData<T> {
    pub fn new(records: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        Self {
            records,
            total,
            page,
            page_size,
            total_page: total_pages(total, page_size),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageData<U> {
        PageData {
            records: self.records.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_page: self.total_page,
        }
    }
}

/// Ceiling division; zero when the page size is not positive.
pub fn total_pages(total: i64, page_size: i64) -> i64 {
    if page_size <= 0 {
        return 0;
    }
    (total + page_size - 1) / page_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(5, 0), 0);
    }

    #[test]
    fn envelope_and_page_serialize_in_camel_case() {
        let page = PageData::new(vec![1, 2], 12, 2, 2);
        let body = serde_json::to_value(ApiResponse::ok(page, "ok")).unwrap();
        assert_eq!(
            body,
            json!({
                "success": true,
                "message": "ok",
                "data": {"records": [1, 2], "total": 12, "page": 2, "pageSize": 2, "totalPage": 6}
            })
        );

        let failed = serde_json::to_value(ApiResponse::fail("nope")).unwrap();
        assert_eq!(failed, json!({"success": false, "data": null, "message": "nope"}));
    }
}
