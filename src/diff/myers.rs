//! Shortest edit script over lines (Myers, O(ND)).

/// What happens to one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Present on both sides.
    Equal,
    /// Only on the old side.
    Delete,
    /// Only on the new side.
    Insert,
}

/// One line of an edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit<'a> {
    /// The operation.
    pub op: Op,
    /// The line text, without its terminator.
    pub line: &'a str,
}

impl<'a> Edit<'a> {
    fn new(op: Op, line: &'a str) -> Self {
        Self { op, line }
    }
}

#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn slot(k: isize, offset: isize) -> usize {
    (k + offset) as usize
}

/// Computes a minimal edit script turning `a` into `b`.
///
/// Deletions are ordered before insertions within a change.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn diff_lines<'a>(a: &[&'a str], b: &[&'a str]) -> Vec<Edit<'a>> {
    let (n, m) = (a.len() as isize, b.len() as isize);
    let max = n + m;
    let offset = max;
    let mut v = vec![0_isize; 2 * max as usize + 2];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'search: for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let down = k == -d || (k != d && v[slot(k - 1, offset)] < v[slot(k + 1, offset)]);
            let mut x = if down { v[slot(k + 1, offset)] } else { v[slot(k - 1, offset)] + 1 };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[slot(k, offset)] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    let (mut x, mut y) = (n, m);
    let mut edits = Vec::with_capacity((n + m) as usize);
    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let down = k == -d || (k != d && v[slot(k - 1, offset)] < v[slot(k + 1, offset)]);
        let prev_k = if down { k + 1 } else { k - 1 };
        let prev_x = v[slot(prev_k, offset)];
        let prev_y = prev_x - prev_k;
        while x > prev_x && y > prev_y {
            edits.push(Edit::new(Op::Equal, a[(x - 1) as usize]));
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                edits.push(Edit::new(Op::Insert, b[(y - 1) as usize]));
            } else {
                edits.push(Edit::new(Op::Delete, a[(x - 1) as usize]));
            }
        }
        x = prev_x;
        y = prev_y;
    }
    edits.reverse();
    edits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(a: &str, b: &str) -> String {
        let a: Vec<&str> = a.lines().collect();
        let b: Vec<&str> = b.lines().collect();
        diff_lines(&a, &b)
            .iter()
            .map(|e| match e.op {
                Op::Equal => format!(" {}", e.line),
                Op::Delete => format!("-{}", e.line),
                Op::Insert => format!("+{}", e.line),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn identical_inputs_are_all_equal() {
        assert_eq!(script("a\nb\n", "a\nb\n"), " a\n b");
    }

    #[test]
    fn empty_sides() {
        assert_eq!(script("", ""), "");
        assert_eq!(script("", "x\ny\n"), "+x\n+y");
        assert_eq!(script("x\n", ""), "-x");
    }

    #[test]
    fn single_replacement() {
        assert_eq!(script("a\nb\nc\n", "a\nB\nc\n"), " a\n-b\n+B\n c");
    }

    #[test]
    fn script_is_minimal() {
        let a: Vec<&str> = "a b c a b b a".split(' ').collect();
        let b: Vec<&str> = "c b a b a c".split(' ').collect();
        let edits = diff_lines(&a, &b);
        let changes = edits.iter().filter(|e| e.op != Op::Equal).count();
        assert_eq!(changes, 5);
        let rebuilt: Vec<&str> =
            edits.iter().filter(|e| e.op != Op::Delete).map(|e| e.line).collect();
        assert_eq!(rebuilt, b);
    }
}
