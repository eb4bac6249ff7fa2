//! In-page scripts
//!
//! Each probe, read and action is serialized to JSON and handed to a small
//! script evaluated in the target frame's document. The scripts share one
//! prelude with the normalization and element lookup helpers, so matching rules
//! are identical for every operation.

use super::{Action, Probe, Read};
use crate::text::{DETAIL_CAPTION_PATTERN, DETAIL_HREF_PATTERN};

/// Helpers shared by every script
///
/// `U` must stay in step with `text::normalize_label`. `DETAIL_CAPTION` and
/// `DETAIL_HREF` are declared ahead of it from the patterns in `text`.
const PRELUDE: &str = r##"
  const U = (t) => (t || '').normalize('NFD').replace(/[\u0300-\u036f]/g, '')
    .toUpperCase().replace(/\s+/g, ' ').trim();
  const TXT = (n) => ((n && n.textContent) || '').replace(/\s+/g, ' ').trim();

  const detailLinks = (doc) => {
    const anchors = Array.from(doc.querySelectorAll('a[href]'));
    const byCaption = anchors.filter((a) => DETAIL_CAPTION.test(a.textContent || ''));
    if (byCaption.length) return byCaption;
    return anchors.filter((a) => DETAIL_HREF.test(a.getAttribute('href') || ''));
  };

  const hasOption = (doc, option) => {
    const want = U(option);
    return Array.from(doc.querySelectorAll('select'))
      .some((s) => Array.from(s.options).some((o) => U(o.textContent) === want));
  };

  const accessibleName = (el) => {
    const aria = el.getAttribute('aria-label');
    if (aria) return aria.trim();
    if (el.tagName === 'INPUT') return (el.value || '').trim();
    return TXT(el);
  };

  const byText = (doc, text) => {
    const hits = Array.from(doc.querySelectorAll('body *')).filter((el) => TXT(el) === text);
    const anchor = hits.find((el) => el.tagName === 'A');
    if (anchor) return anchor;
    return hits.find((el) => !Array.from(el.children).some((c) => TXT(c) === text)) || null;
  };

  const locate = (doc, loc) => {
    switch (loc.kind) {
      case 'css':
        return doc.querySelector(loc.css);
      case 'select-with-option': {
        const want = U(loc.option);
        return Array.from(doc.querySelectorAll('select'))
          .find((s) => Array.from(s.options).some((o) => U(o.textContent) === want)) || null;
      }
      case 'submit':
        return Array.from(doc.querySelectorAll("input[type='submit'], button[type='submit']"))
          .find((el) => accessibleName(el) === loc.caption) || null;
      case 'role': {
        if (loc.role === 'link') {
          return Array.from(doc.querySelectorAll("a[href], [role='link']"))
            .find((el) => accessibleName(el) === loc.name) || null;
        }
        const want = U(loc.name);
        return Array.from(doc.querySelectorAll(
          "button, input[type='submit'], input[type='button'], [role='button']"))
          .find((el) => U(accessibleName(el)) === want) || null;
      }
      case 'text':
        return byText(doc, loc.text);
      case 'detail-link':
        return detailLinks(doc)[loc.index] || null;
      default:
        return null;
    }
  };

  const fire = (s) => {
    s.dispatchEvent(new Event('change', { bubbles: true }));
    s.dispatchEvent(new Event('input', { bubbles: true }));
    if (s.blur) s.blur();
  };
"##;

const PROBE: &str = r##"
  switch (req.kind) {
    case 'selector': {
      const el = document.querySelector(req.css);
      if (!el) return false;
      if (req.state === 'attached') return true;
      const style = window.getComputedStyle(el);
      return style.visibility !== 'hidden' && el.getClientRects().length > 0;
    }
    case 'exists':
      return !!locate(document, req.locator);
    case 'option-in-frame':
      return hasOption(document, req.option);
    case 'option-in-tree': {
      if (hasOption(document, req.option)) return true;
      const visit = (doc) => {
        for (const frame of Array.from(doc.querySelectorAll('iframe, frame'))) {
          try {
            const inner = frame.contentDocument;
            if (!inner) continue;
            if (hasOption(inner, req.option) || visit(inner)) return true;
          } catch (e) {}
        }
        return false;
      };
      return visit(document);
    }
    case 'list-ready':
      return Array.from(document.querySelectorAll('a[href]')).some((a) =>
        DETAIL_HREF.test(a.getAttribute('href') || '') || DETAIL_CAPTION.test(a.textContent || ''));
    case 'detail-ready':
      return !!document.querySelector(req.back_selector) || !!byText(document, req.back_text);
    default:
      return false;
  }
"##;

const READ: &str = r##"
  switch (req.kind) {
    case 'selected-text': {
      const s = locate(document, req.locator);
      if (!s || s.selectedIndex < 0) return '';
      const opt = s.options[s.selectedIndex];
      return ((opt && opt.textContent) || '').trim();
    }
    case 'page-anchors':
      return Array.from(document.querySelectorAll('a[href]')).map((a) => (a.textContent || '').trim());
    case 'detail-link-count':
      return detailLinks(document).length;
    case 'list-fingerprint':
      return [location.href]
        .concat(detailLinks(document).map((a) => a.getAttribute('href') || ''))
        .join('\n');
    case 'detail-snapshot': {
      const first = (sel) => {
        const el = document.querySelector(sel);
        return el ? (el.textContent || '').trim() : '';
      };
      const title = first('h1') || first('h2') || first('.titulo, .title, .tit');
      const pairs = [];
      for (const tr of Array.from(document.querySelectorAll('table tr'))) {
        const ths = Array.from(tr.querySelectorAll('th'));
        const tds = Array.from(tr.querySelectorAll('td'));
        if (ths.length === 1 && tds.length === 1) {
          pairs.push({ label: TXT(ths[0]), value: TXT(tds[0]) });
        } else if (ths.length === 0 && tds.length >= 2) {
          const label = TXT(tds[0]);
          const value = TXT(tds[1]);
          if (label && value) pairs.push({ label, value });
        }
      }
      for (const dt of Array.from(document.querySelectorAll('dt'))) {
        const dd = dt.nextElementSibling;
        if (dd) pairs.push({ label: TXT(dt), value: TXT(dd) });
      }
      const description = first('#descricao') || first('.descricao')
        || first("[id*='descri']") || first("[class*='descri']");
      const bold_labels = Array.from(document.querySelectorAll('b, strong')).map((b) => ({
        label: TXT(b),
        context: b.parentElement ? TXT(b.parentElement) : '',
      }));
      return {
        link: location.href,
        title: title || null,
        pairs,
        description: description || null,
        bold_labels,
      };
    }
    default:
      return null;
  }
"##;

const ACTION: &str = r##"
  switch (req.kind) {
    case 'select-by-text': {
      const s = locate(document, req.select);
      if (!s || !s.options) return false;
      const want = U(req.text);
      const opt = Array.from(s.options).find((o) => U(o.textContent) === want);
      if (!opt) return false;
      s.value = opt.value;
      fire(s);
      return true;
    }
    case 'select-by-partial-text': {
      const s = locate(document, req.select);
      if (!s || !s.options) return false;
      const want = U(req.text);
      const opt = Array.from(s.options).find((o) => U(o.textContent).includes(want));
      if (!opt) return false;
      s.value = opt.value;
      fire(s);
      return true;
    }
    case 'select-by-value': {
      const s = locate(document, req.select);
      if (!s || !s.options) return false;
      const opt = Array.from(s.options).find((o) => o.value === req.value);
      if (!opt) return false;
      s.value = opt.value;
      fire(s);
      return true;
    }
    case 'reset-selects': {
      const keep = req.except.map((loc) => locate(document, loc)).filter(Boolean);
      const want = U(req.option);
      let changed = false;
      for (const s of Array.from(document.querySelectorAll('select'))) {
        if (keep.includes(s)) continue;
        const opt = Array.from(s.options).find((o) => U(o.textContent) === want);
        if (!opt) continue;
        s.value = opt.value;
        fire(s);
        changed = true;
      }
      return changed;
    }
    case 'check-all-checkboxes': {
      const boxes = Array.from(document.querySelectorAll("input[type='checkbox']"));
      boxes.forEach((cb) => { if (!cb.disabled && !cb.checked) cb.click(); });
      return boxes.length > 0;
    }
    case 'click': {
      const el = locate(document, req.locator);
      if (!el) return false;
      if (el.scrollIntoView) el.scrollIntoView({ block: 'center' });
      setTimeout(() => el.click(), 0);
      return true;
    }
    case 'call-function': {
      const fn = window[req.name];
      if (typeof fn !== 'function') return false;
      setTimeout(() => fn(), 0);
      return true;
    }
    default:
      return false;
  }
"##;

/// Script polled while the top document is still parsing
pub const READY_STATE: &str = "document.readyState !== 'loading'";

/// Builds the script evaluating a probe
pub fn probe_script(probe: &Probe) -> String {
    assemble(&to_json(probe), PROBE)
}

/// Builds the script evaluating a read
pub fn read_script(read: &Read) -> String {
    assemble(&to_json(read), READ)
}

/// Builds the script performing an action
pub fn action_script(action: &Action) -> String {
    assemble(&to_json(action), ACTION)
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    // Plain enums of strings, numbers and vectors always serialize
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

fn assemble(request: &str, body: &str) -> String {
    let mut script = String::with_capacity(PRELUDE.len() + body.len() + request.len() + 256);
    script.push_str("(function (req) {\n");
    script.push_str(&format!(
        "  const DETAIL_CAPTION = new RegExp({}, 'i');\n  const DETAIL_HREF = new RegExp({}, 'i');\n",
        to_json(&DETAIL_CAPTION_PATTERN),
        to_json(&DETAIL_HREF_PATTERN)
    ));
    script.push_str(PRELUDE);
    script.push_str(body);
    script.push_str("\n})(");
    script.push_str(request);
    script.push(')');
    script
}
