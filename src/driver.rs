use crate::codec::{self, Value};
use crate::constants::RUNTIME_ERROR_MARKER;
use crate::domain::{MethodSignature, ParamType, TestCase};

/// Fixed scaffolding shared by every generated driver: node structs, the
/// tolerant parsers for the bracketed notation, and the renderers that print
/// results back in canonical form.
const PRELUDE: &str = r#"#include <algorithm>
#include <cmath>
#include <cstdlib>
#include <iostream>
#include <queue>
#include <sstream>
#include <stdexcept>
#include <string>
#include <vector>
using namespace std;

struct ListNode {
    int val;
    ListNode *next;
    ListNode() : val(0), next(nullptr) {}
    ListNode(int x) : val(x), next(nullptr) {}
    ListNode(int x, ListNode *next) : val(x), next(next) {}
};

struct TreeNode {
    int val;
    TreeNode *left;
    TreeNode *right;
    TreeNode() : val(0), left(nullptr), right(nullptr) {}
    TreeNode(int x) : val(x), left(nullptr), right(nullptr) {}
    TreeNode(int x, TreeNode *left, TreeNode *right) : val(x), left(left), right(right) {}
};

static int parseIntToken(const string &s) {
    try {
        return stoi(s);
    } catch (...) {
        return 0;
    }
}

static double parseDoubleToken(const string &s) {
    try {
        return stod(s);
    } catch (...) {
        return 0.0;
    }
}

static vector<string> splitTokens(const string &s) {
    vector<string> out;
    if (s.empty() || s == "[]" || s == "null") return out;
    string body = s;
    if (!body.empty() && body.front() == '[') body = body.substr(1);
    if (!body.empty() && body.back() == ']') body = body.substr(0, body.size() - 1);
    string cur;
    bool quoted = false;
    for (char c : body) {
        if (c == '"') {
            quoted = !quoted;
            cur += c;
        } else if (c == ',' && !quoted) {
            out.push_back(cur);
            cur.clear();
        } else {
            cur += c;
        }
    }
    if (!cur.empty()) out.push_back(cur);
    for (auto &tok : out) {
        size_t b = tok.find_first_not_of(" \t");
        size_t e = tok.find_last_not_of(" \t");
        tok = (b == string::npos) ? string() : tok.substr(b, e - b + 1);
    }
    return out;
}

static vector<int> parseIntVector(const string &s) {
    vector<int> out;
    for (const string &tok : splitTokens(s)) out.push_back(parseIntToken(tok));
    return out;
}

static string unquote(const string &s) {
    if (s.size() >= 2 && s.front() == '"' && s.back() == '"') return s.substr(1, s.size() - 2);
    return s;
}

static vector<string> parseStringVector(const string &s) {
    vector<string> out;
    for (const string &tok : splitTokens(s)) out.push_back(unquote(tok));
    return out;
}

static ListNode *makeList(const vector<int> &vals) {
    ListNode *head = nullptr;
    ListNode **cur = &head;
    for (int v : vals) {
        *cur = new ListNode(v);
        cur = &((*cur)->next);
    }
    return head;
}

static TreeNode *makeTree(const string &s) {
    vector<string> toks = splitTokens(s);
    if (toks.empty() || toks[0] == "null") return nullptr;
    TreeNode *root = new TreeNode(parseIntToken(toks[0]));
    queue<TreeNode *> pending;
    pending.push(root);
    size_t i = 1;
    while (!pending.empty() && i < toks.size()) {
        TreeNode *parent = pending.front();
        pending.pop();
        if (i < toks.size()) {
            if (toks[i] != "null") {
                parent->left = new TreeNode(parseIntToken(toks[i]));
                pending.push(parent->left);
            }
            ++i;
        }
        if (i < toks.size()) {
            if (toks[i] != "null") {
                parent->right = new TreeNode(parseIntToken(toks[i]));
                pending.push(parent->right);
            }
            ++i;
        }
    }
    return root;
}

static string toText(int v) { return to_string(v); }

static string toText(double v) {
    ostringstream os;
    os << v;
    return os.str();
}

static string toText(const string &v) { return v; }

static string toText(const vector<int> &v) {
    string out = "[";
    for (size_t i = 0; i < v.size(); ++i) {
        if (i) out += ",";
        out += to_string(v[i]);
    }
    return out + "]";
}

static string toText(const vector<string> &v) {
    string out = "[";
    for (size_t i = 0; i < v.size(); ++i) {
        if (i) out += ",";
        out += "\"" + v[i] + "\"";
    }
    return out + "]";
}

static string toText(ListNode *head) {
    vector<int> vals;
    while (head) {
        vals.push_back(head->val);
        head = head->next;
    }
    return toText(vals);
}

static string toText(TreeNode *root) {
    vector<string> toks;
    queue<TreeNode *> q;
    q.push(root);
    while (!q.empty()) {
        TreeNode *node = q.front();
        q.pop();
        if (!node) {
            toks.push_back("null");
            continue;
        }
        toks.push_back(to_string(node->val));
        q.push(node->left);
        q.push(node->right);
    }
    while (!toks.empty() && toks.back() == "null") toks.pop_back();
    string out = "[";
    for (size_t i = 0; i < toks.size(); ++i) {
        if (i) out += ",";
        out += toks[i];
    }
    return out + "]";
}
"#;

/// Emits a self-contained C++ driver around the user's method body. Pure:
/// equal inputs always produce byte-identical output.
///
/// Each matching test case becomes one block that constructs the parameters,
/// invokes the method, and prints the canonical result line. A throw inside
/// the invocation prints the error marker for that case and execution moves
/// on to the next one. Cases whose input count does not match the signature
/// are skipped entirely; the evaluator reports them as infra failures.
pub fn generate(signature: &MethodSignature, body: &str, cases: &[TestCase]) -> String {
    let mut src = String::with_capacity(PRELUDE.len() + body.len() + 512 * cases.len());
    src.push_str(PRELUDE);
    src.push('\n');
    src.push_str(&wrap_solution(body));
    src.push_str("\n\nint main() {\n    Solution solution;\n");

    for (pos, case) in cases.iter().enumerate() {
        let n = pos + 1;
        if case.inputs.len() != signature.params.len() {
            continue;
        }

        let expected = escape_cpp(&canonical_literal(&case.expected, signature.returns));
        let mut args = Vec::with_capacity(signature.params.len());
        src.push_str(&format!("\n    // case {n}\n    try {{\n"));
        for (i, (param, input)) in signature.params.iter().zip(&case.inputs).enumerate() {
            let arg = format!("arg{pos}_{i}");
            src.push_str(&format!(
                "        {}\n",
                param_decl(&arg, param.ty, input)
            ));
            args.push(arg);
        }
        src.push_str(&format!(
            "        auto result{pos} = solution.{}({});\n",
            signature.name,
            args.join(", ")
        ));
        src.push_str(&format!(
            "        cout << \"Test {n} - Output: \" << toText(result{pos}) << \", Expected: \" << \"{expected}\" << endl;\n"
        ));
        src.push_str(&format!(
            "    }} catch (...) {{\n        cout << \"Test {n} - Output: {RUNTIME_ERROR_MARKER}, Expected: \" << \"{expected}\" << endl;\n    }}\n"
        ));
    }

    src.push_str("\n    return 0;\n}\n");
    src
}

fn wrap_solution(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.contains("class Solution") {
        trimmed.to_string()
    } else {
        format!("class Solution {{\npublic:\n{trimmed}\n}};")
    }
}

fn param_decl(name: &str, ty: ParamType, input: &str) -> String {
    let literal = escape_cpp(&canonical_literal(input, ty));
    match ty {
        ParamType::Int => format!("int {name} = parseIntToken(\"{literal}\");"),
        ParamType::Double => format!("double {name} = parseDoubleToken(\"{literal}\");"),
        ParamType::Str => format!("string {name} = \"{literal}\";"),
        ParamType::IntArray => format!("vector<int> {name} = parseIntVector(\"{literal}\");"),
        ParamType::StrArray => {
            format!("vector<string> {name} = parseStringVector(\"{literal}\");")
        }
        ParamType::LinkedListOfInt => {
            format!("ListNode *{name} = makeList(parseIntVector(\"{literal}\"));")
        }
        ParamType::BinaryTreeOfInt => format!("TreeNode *{name} = makeTree(\"{literal}\");"),
    }
}

/// Re-renders a literal through the codec so embedded text is canonical and
/// generation stays deterministic. Structurally malformed literals collapse
/// to the type's empty value.
fn canonical_literal(text: &str, ty: ParamType) -> String {
    let value = codec::parse(text, ty).unwrap_or_else(|_| Value::empty(ty));
    codec::render(&value)
}

fn escape_cpp(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Param;

    fn reverse_signature() -> MethodSignature {
        MethodSignature {
            name: "reverse".to_string(),
            params: vec![Param::new("x", ParamType::Int)],
            returns: ParamType::Int,
        }
    }

    const REVERSE_BODY: &str = "int reverse(int x) { return 0; }";

    #[test]
    fn test_generation_is_deterministic() {
        let cases = vec![
            TestCase::new(&["123"], "321"),
            TestCase::new(&["-123"], "-321"),
        ];
        let a = generate(&reverse_signature(), REVERSE_BODY, &cases);
        let b = generate(&reverse_signature(), REVERSE_BODY, &cases);
        assert_eq!(a, b);
    }

    #[test]
    fn test_one_block_per_case_in_order() {
        let cases = vec![
            TestCase::new(&["123"], "321"),
            TestCase::new(&["120"], "21"),
            TestCase::new(&["1534236469"], "0"),
        ];
        let src = generate(&reverse_signature(), REVERSE_BODY, &cases);

        let first = src.find("Test 1 - Output: ").unwrap();
        let second = src.find("Test 2 - Output: ").unwrap();
        let third = src.find("Test 3 - Output: ").unwrap();
        assert!(first < second && second < third);
        assert!(src.contains("int arg0_0 = parseIntToken(\"123\");"));
        assert!(src.contains("solution.reverse(arg0_0)"));
        assert!(src.contains(", Expected: \" << \"321\""));
    }

    #[test]
    fn test_wraps_bare_body_into_solution_class() {
        let src = generate(&reverse_signature(), REVERSE_BODY, &[]);
        assert!(src.contains("class Solution {\npublic:\nint reverse(int x)"));

        let already_wrapped = "class Solution {\npublic:\n    int reverse(int x) { return 0; }\n};";
        let src = generate(&reverse_signature(), already_wrapped, &[]);
        assert_eq!(src.matches("class Solution").count(), 1);
    }

    #[test]
    fn test_arity_mismatch_is_skipped() {
        let cases = vec![
            TestCase::new(&["123", "4"], "321"),
            TestCase::new(&["120"], "21"),
        ];
        let src = generate(&reverse_signature(), REVERSE_BODY, &cases);
        assert!(!src.contains("Test 1 - Output: "));
        assert!(src.contains("Test 2 - Output: "));
    }

    #[test]
    fn test_error_marker_fallback_per_case() {
        let cases = vec![TestCase::new(&["123"], "321")];
        let src = generate(&reverse_signature(), REVERSE_BODY, &cases);
        assert!(src.contains("catch (...)"));
        assert!(src.contains(&format!("Test 1 - Output: {RUNTIME_ERROR_MARKER}, Expected: ")));
    }

    #[test]
    fn test_aggregate_parameters_are_canonicalized() {
        let signature = MethodSignature {
            name: "merge".to_string(),
            params: vec![
                Param::new("nums", ParamType::IntArray),
                Param::new("words", ParamType::StrArray),
                Param::new("list", ParamType::LinkedListOfInt),
                Param::new("tree", ParamType::BinaryTreeOfInt),
            ],
            returns: ParamType::IntArray,
        };
        let cases = vec![TestCase::new(
            &["[1, 2, 3]", "[\"a\",\"b\"]", "[4,5]", "[1,null,2]"],
            "[1,2,3]",
        )];
        let src = generate(&signature, "int merge() { return 0; }", &cases);

        assert!(src.contains("vector<int> arg0_0 = parseIntVector(\"[1,2,3]\");"));
        assert!(src.contains("vector<string> arg0_1 = parseStringVector(\"[\\\"a\\\",\\\"b\\\"]\");"));
        assert!(src.contains("ListNode *arg0_2 = makeList(parseIntVector(\"[4,5]\"));"));
        assert!(src.contains("TreeNode *arg0_3 = makeTree(\"[1,null,2]\");"));
    }

    #[test]
    fn test_string_parameter_is_escaped() {
        let signature = MethodSignature {
            name: "echo".to_string(),
            params: vec![Param::new("s", ParamType::Str)],
            returns: ParamType::Str,
        };
        let cases = vec![TestCase::new(&["say \"hi\""], "say \"hi\"")];
        let src = generate(&signature, "string echo(string s) { return s; }", &cases);
        assert!(src.contains("string arg0_0 = \"say \\\"hi\\\"\";"));
    }
}
