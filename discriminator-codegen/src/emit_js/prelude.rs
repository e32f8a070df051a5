/// Helpers every generated module starts with.
///
/// Coverage records (`_ev()`) are `{p, a, i}`: evaluated property names,
/// "all properties evaluated" and "all items evaluated".
pub const PRELUDE: &str = r#"function _obj(v) {
  return v !== null && typeof v === "object" && !Array.isArray(v);
}
function _has(v, k) {
  return Object.prototype.hasOwnProperty.call(v, k);
}
function _eq(a, b) {
  if (a === b) return true;
  if (Array.isArray(a)) {
    return Array.isArray(b) && a.length === b.length && a.every((x, i) => _eq(x, b[i]));
  }
  if (_obj(a) && _obj(b)) {
    const ka = Object.keys(a);
    return ka.length === Object.keys(b).length && ka.every((k) => _has(b, k) && _eq(a[k], b[k]));
  }
  return false;
}
function _len(s) {
  return [...s].length;
}
function _esc(k) {
  return k.replace(/~/g, "~0").replace(/\//g, "~1");
}
function _ev() {
  return { p: new Set(), a: false, i: false };
}
function _merge(t, s) {
  t.a = t.a || s.a;
  t.i = t.i || s.i;
  for (const k of s.p) t.p.add(k);
}
function _seen(ev, k) {
  return ev.a || ev.p.has(k);
}
"#;
