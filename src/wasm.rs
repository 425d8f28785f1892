use num_traits::ToPrimitive;
use wasm_bindgen::prelude::*;

use crate::request::{BlockFilter, FieldSelection, SolanaRequest};
use crate::transform::amount;
use crate::types::RawBlock;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = JSON)]
    fn parse(s: &str) -> JsValue;
}

fn to_js<T: serde::Serialize>(value: &T) -> JsValue {
    match serde_json::to_string(value) {
        Ok(json_str) => parse(&json_str),
        Err(_) => JsValue::NULL,
    }
}

/// Transform one archive block (JSON text) into its RPC form.
#[wasm_bindgen]
pub fn transform_block_json(json: &str) -> JsValue {
    let raw: RawBlock = match serde_json::from_str(json) {
        Ok(raw) => raw,
        Err(e) => return error_result(&format!("Invalid block JSON: {e}")),
    };

    match crate::transform::transform_block(&raw) {
        Ok(block) => to_js(&block),
        Err(e) => error_result(&e.to_string()),
    }
}

/// Scale a raw token amount by its mint decimals. `value` is lossy, `display` exact.
#[wasm_bindgen]
pub fn scale_token_amount(amount: &str, decimals: u8) -> JsValue {
    match amount::scale(amount, decimals, "wasm input") {
        Ok(scaled) => to_js(&serde_json::json!({
            "value": scaled.value.to_f64(),
            "display": scaled.display,
        })),
        Err(e) => error_result(&e.to_string()),
    }
}

/// Build the unfiltered single-block query in either archive dialect.
#[wasm_bindgen]
pub fn full_block_request(slot: f64, legacy: bool) -> JsValue {
    let fields = if legacy {
        FieldSelection::legacy()
    } else {
        FieldSelection::portal()
    };
    to_js(&SolanaRequest::full_block(slot as u64, fields))
}

/// Build the block-discovery query for a range and a JSON block filter.
#[wasm_bindgen]
pub fn matching_blocks_request(from: f64, to: f64, filter_json: &str) -> JsValue {
    let filter: BlockFilter = match serde_json::from_str(filter_json) {
        Ok(filter) => filter,
        Err(e) => return error_result(&format!("Invalid filter JSON: {e}")),
    };

    match SolanaRequest::matching_blocks(from as u64, to as u64, &filter) {
        Ok(request) => to_js(&request),
        Err(e) => error_result(&e.to_string()),
    }
}

fn error_result(msg: &str) -> JsValue {
    let obj = serde_json::json!({"error": msg});
    to_js(&obj)
}
