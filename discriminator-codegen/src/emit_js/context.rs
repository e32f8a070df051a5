/// EmitContext: the data threaded through each emit function.
///
/// `val`, `ip` and `ev` are JS expressions for the value being validated,
/// its instance path, and its evaluated-coverage record. `sp` is the schema
/// location of the current schema object; it is static, so it is kept as a
/// plain string and emitted as a literal. Descending produces a new context.
use super::writer::quote;
use crate::resolver::escape_pointer;

#[derive(Debug, Clone)]
pub struct EmitContext {
    pub val: String,
    pub ip: String,
    pub sp: String,
    pub ev: String,
}

impl EmitContext {
    /// Root context for the entry-point validate() function.
    pub fn root() -> Self {
        Self {
            val: "instance".into(),
            ip: "\"\"".into(),
            sp: "#".into(),
            ev: "ev".into(),
        }
    }

    /// Context for a definition function body: `validate_x(v, e, p, ev)`.
    pub fn definition(key: &str) -> Self {
        Self {
            val: "v".into(),
            ip: "p".into(),
            sp: key.to_string(),
            ev: "ev".into(),
        }
    }

    /// Schema location of one of this schema's keywords.
    pub fn at(&self, keyword: &str) -> String {
        format!("{}/{keyword}", self.sp)
    }

    /// Descend into a named property; `at` is the `properties` location.
    pub fn property(&self, name: &str, at: &str, ev: &str) -> Self {
        let segment = escape_pointer(name);
        Self {
            val: format!("{}[{}]", self.val, quote(name)),
            ip: format!("{} + {}", self.ip, quote(&format!("/{segment}"))),
            sp: format!("{at}/{segment}"),
            ev: ev.to_string(),
        }
    }

    /// Descend into the property named by the loop variable `key_var`.
    pub fn entry(&self, key_var: &str, sp: &str, ev: &str) -> Self {
        Self {
            val: format!("{}[{key_var}]", self.val),
            ip: format!("{} + \"/\" + _esc({key_var})", self.ip),
            sp: sp.to_string(),
            ev: ev.to_string(),
        }
    }

    /// Descend into the array element at loop variable `idx_var`.
    pub fn element(&self, idx_var: &str, sp: &str, ev: &str) -> Self {
        Self {
            val: format!("{}[{idx_var}]", self.val),
            ip: format!("{} + \"/\" + {idx_var}", self.ip),
            sp: sp.to_string(),
            ev: ev.to_string(),
        }
    }

    /// Same value under another schema location (allOf member, oneOf
    /// alternative, ...).
    pub fn branch(&self, sp: String, ev: &str) -> Self {
        Self {
            val: self.val.clone(),
            ip: self.ip.clone(),
            sp,
            ev: ev.to_string(),
        }
    }

    /// The statement that records one error. `params` is a JS expression.
    pub fn push_error(&self, schema_path: &str, keyword: &str, params: &str) -> String {
        format!(
            "e.push({{instancePath: {}, schemaPath: {}, keyword: {}, params: {params}}});",
            self.ip,
            quote(schema_path),
            quote(keyword)
        )
    }
}
