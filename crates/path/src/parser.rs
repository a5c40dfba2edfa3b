//! A `nom`-based parser for the path expression language.
use super::ast::{BinaryOp, Expression, PathSegment, Selection, SelectionHead, UnaryOp};
use crate::error::PathError;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, u64 as nom_u64},
    combinator::{map, not, opt, recognize, value},
    multi::{fold_many0, many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};
use stencil_value::Value;

// --- Main Public Parser ---

pub fn parse_expression(input: &str) -> Result<Expression, PathError> {
    match expression(input.trim()) {
        Ok(("", expr)) => Ok(expr),
        Ok((rest, _)) => Err(PathError::Parse {
            expression: input.to_string(),
            message: format!("parser did not consume all input, remainder: '{rest}'"),
        }),
        Err(e) => Err(PathError::Parse {
            expression: input.to_string(),
            message: e.to_string(),
        }),
    }
}

// --- Operator Precedence Ladder ---

fn expression(input: &str) -> IResult<&str, Expression> {
    or_expr(input)
}

fn or_expr(input: &str) -> IResult<&str, Expression> {
    let (input, first) = and_expr(input)?;
    fold_many0(
        pair(or_op, and_expr),
        move || first.clone(),
        fold_binary,
    )(input)
}

fn and_expr(input: &str) -> IResult<&str, Expression> {
    let (input, first) = equality_expr(input)?;
    fold_many0(
        pair(and_op, equality_expr),
        move || first.clone(),
        fold_binary,
    )(input)
}

fn equality_expr(input: &str) -> IResult<&str, Expression> {
    let (input, first) = comparison_expr(input)?;
    fold_many0(
        pair(eq_op, comparison_expr),
        move || first.clone(),
        fold_binary,
    )(input)
}

fn comparison_expr(input: &str) -> IResult<&str, Expression> {
    let (input, first) = additive_expr(input)?;
    fold_many0(
        pair(cmp_op, additive_expr),
        move || first.clone(),
        fold_binary,
    )(input)
}

fn additive_expr(input: &str) -> IResult<&str, Expression> {
    let (input, first) = multiplicative_expr(input)?;
    fold_many0(
        pair(add_op, multiplicative_expr),
        move || first.clone(),
        fold_binary,
    )(input)
}

fn multiplicative_expr(input: &str) -> IResult<&str, Expression> {
    let (input, first) = unary_expr(input)?;
    fold_many0(
        pair(mul_op, unary_expr),
        move || first.clone(),
        fold_binary,
    )(input)
}

fn fold_binary(lhs: Expression, (op, rhs): (BinaryOp, Expression)) -> Expression {
    Expression::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn unary_expr(input: &str) -> IResult<&str, Expression> {
    alt((
        map(preceded(ws(char('-')), unary_expr), |operand| {
            Expression::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            }
        }),
        postfix_expr,
    ))(input)
}

// --- Operator Parsers ---

fn or_op(input: &str) -> IResult<&str, BinaryOp> {
    value(BinaryOp::Or, word_token("or"))(input)
}

fn and_op(input: &str) -> IResult<&str, BinaryOp> {
    value(BinaryOp::And, word_token("and"))(input)
}

fn eq_op(input: &str) -> IResult<&str, BinaryOp> {
    ws(alt((
        value(BinaryOp::Ne, tag("!=")),
        value(BinaryOp::Eq, char('=')),
    )))(input)
}

fn cmp_op(input: &str) -> IResult<&str, BinaryOp> {
    ws(alt((
        value(BinaryOp::Le, tag("<=")),
        value(BinaryOp::Ge, tag(">=")),
        value(BinaryOp::Lt, char('<')),
        value(BinaryOp::Gt, char('>')),
    )))(input)
}

fn add_op(input: &str) -> IResult<&str, BinaryOp> {
    ws(alt((
        value(BinaryOp::Add, char('+')),
        value(BinaryOp::Sub, char('-')),
    )))(input)
}

fn mul_op(input: &str) -> IResult<&str, BinaryOp> {
    ws(alt((
        value(BinaryOp::Mul, char('*')),
        value(BinaryOp::Div, char('/')),
    )))(input)
}

/// A keyword operator: the bare word, not a prefix of a longer identifier.
fn word_token(kw: &'static str) -> impl FnMut(&str) -> IResult<&str, &str> {
    move |input| delimited(multispace0, terminated(tag(kw), keyword_boundary), multispace0)(input)
}

fn keyword_boundary(input: &str) -> IResult<&str, ()> {
    value((), not(alt((alphanumeric1, tag("_")))))(input)
}

// --- Navigation Chains ---

fn postfix_expr(input: &str) -> IResult<&str, Expression> {
    let (input, head) = primary(input)?;
    let (input, segments) = many0(path_segment)(input)?;
    Ok((input, assemble(head, segments)))
}

fn assemble(head: SelectionHead, segments: Vec<PathSegment>) -> Expression {
    if segments.is_empty() {
        return match head {
            SelectionHead::Literal(v) => Expression::Literal(v),
            SelectionHead::Group(inner) => *inner,
            other => Expression::Selection(Selection {
                head: other,
                segments,
            }),
        };
    }
    Expression::Selection(Selection { head, segments })
}

fn primary(input: &str) -> IResult<&str, SelectionHead> {
    ws(alt((
        value(SelectionHead::This, terminated(tag("$this"), keyword_boundary)),
        map(preceded(char('%'), identifier), |name| {
            SelectionHead::Variable(name.to_string())
        }),
        // `{}` evaluates to the empty collection
        value(
            SelectionHead::Group(Box::new(Expression::Empty)),
            empty_collection,
        ),
        map(literal, SelectionHead::Literal),
        function_call, // Must be before the bare identifier to parse `func()` not `func`
        map(identifier, |name| SelectionHead::Key(name.to_string())),
        map(
            delimited(ws(char('(')), expression, ws(char(')'))),
            |inner| SelectionHead::Group(Box::new(inner)),
        ),
    )))(input)
}

fn path_segment(input: &str) -> IResult<&str, PathSegment> {
    preceded(
        multispace0,
        alt((
            method_call, // Must be before key_segment to parse `.func()` not `.func`
            key_segment,
            index_segment,
        )),
    )(input)
}

fn key_segment(input: &str) -> IResult<&str, PathSegment> {
    map(preceded(char('.'), identifier), |name| {
        PathSegment::Key(name.to_string())
    })(input)
}

fn index_segment(input: &str) -> IResult<&str, PathSegment> {
    map(delimited(char('['), ws(nom_u64), char(']')), |i| {
        PathSegment::Index(i as usize)
    })(input)
}

fn method_call(input: &str) -> IResult<&str, PathSegment> {
    map(
        pair(preceded(char('.'), identifier), call_args),
        |(name, args)| PathSegment::Call {
            name: name.to_string(),
            args,
        },
    )(input)
}

fn function_call(input: &str) -> IResult<&str, SelectionHead> {
    map(pair(identifier, call_args), |(name, args)| {
        SelectionHead::Call {
            name: name.to_string(),
            args,
        }
    })(input)
}

fn call_args(input: &str) -> IResult<&str, Vec<Expression>> {
    delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), expression),
        ws(char(')')),
    )(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

// --- Literal Parsers ---

fn literal(input: &str) -> IResult<&str, Value> {
    alt((boolean, number, string_literal))(input)
}

fn boolean(input: &str) -> IResult<&str, Value> {
    alt((
        value(Value::Bool(true), terminated(tag("true"), keyword_boundary)),
        value(Value::Bool(false), terminated(tag("false"), keyword_boundary)),
    ))(input)
}

fn number(input: &str) -> IResult<&str, Value> {
    let (rest, text) = recognize(pair(digit1, opt(pair(char('.'), digit1))))(input)?;
    let parsed = if text.contains('.') {
        Value::Float(text.parse().unwrap_or(f64::NAN))
    } else {
        text.parse::<i64>()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Float(text.parse().unwrap_or(f64::NAN)))
    };
    Ok((rest, parsed))
}

fn string_literal(input: &str) -> IResult<&str, Value> {
    map(
        delimited(char('\''), single_quoted_chars, char('\'')),
        |s: &str| Value::String(s.to_string()),
    )(input)
}

fn single_quoted_chars(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c != '\'')(input)
}

fn empty_collection(input: &str) -> IResult<&str, ()> {
    value((), pair(char('{'), preceded(multispace0, char('}'))))(input)
}

/// A combinator that takes a parser `inner` and produces a parser that consumes surrounding whitespace.
fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_path() {
        let expr = parse_expression("customer.name").unwrap();
        assert_eq!(
            expr,
            Expression::Selection(Selection {
                head: SelectionHead::Key("customer".to_string()),
                segments: vec![PathSegment::Key("name".to_string())],
            })
        );
    }

    #[test]
    fn test_parse_index_and_method() {
        let expr = parse_expression("orders[1].first()").unwrap();
        assert_eq!(
            expr,
            Expression::Selection(Selection {
                head: SelectionHead::Key("orders".to_string()),
                segments: vec![
                    PathSegment::Index(1),
                    PathSegment::Call {
                        name: "first".to_string(),
                        args: vec![],
                    }
                ],
            })
        );
    }

    #[test]
    fn test_parse_variable_chain() {
        let expr = parse_expression("%context.list.key").unwrap();
        assert_eq!(
            expr,
            Expression::Selection(Selection {
                head: SelectionHead::Variable("context".to_string()),
                segments: vec![
                    PathSegment::Key("list".to_string()),
                    PathSegment::Key("key".to_string())
                ],
            })
        );
    }

    #[test]
    fn test_parse_binary_precedence() {
        // `a + b = c` groups the addition first
        let expr = parse_expression("a + b = c").unwrap();
        match expr {
            Expression::Binary {
                op: BinaryOp::Eq,
                lhs,
                ..
            } => {
                assert!(matches!(
                    *lhs,
                    Expression::Binary {
                        op: BinaryOp::Add,
                        ..
                    }
                ));
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_parse_empty_collection() {
        assert_eq!(parse_expression("{}").unwrap(), Expression::Empty);
        assert_eq!(parse_expression("{ }").unwrap(), Expression::Empty);
    }

    #[test]
    fn test_parse_lambda_with_this() {
        let expr = parse_expression("list.where($this = 0)").unwrap();
        let Expression::Selection(Selection { segments, .. }) = expr else {
            panic!("expected selection");
        };
        let PathSegment::Call { name, args } = &segments[0] else {
            panic!("expected call segment");
        };
        assert_eq!(name, "where");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_parse_multiline_whitespace() {
        let expr = parse_expression("list.where(\n$this.key=1\n).key").unwrap();
        assert!(matches!(expr, Expression::Selection(_)));
    }

    #[test]
    fn test_parse_keywords_need_boundaries() {
        // `android` is an identifier, not `and` followed by `roid`
        let expr = parse_expression("android").unwrap();
        assert_eq!(
            expr,
            Expression::Selection(Selection {
                head: SelectionHead::Key("android".to_string()),
                segments: vec![],
            })
        );
        // `trueish` is an identifier, not the boolean literal
        let expr = parse_expression("trueish").unwrap();
        assert!(matches!(
            expr,
            Expression::Selection(Selection {
                head: SelectionHead::Key(_),
                ..
            })
        ));
    }

    #[test]
    fn test_parse_rejects_unterminated_string() {
        assert!(parse_expression("item.where(linkId='a)").is_err());
    }

    #[test]
    fn test_parse_rejects_trailing_garbage() {
        assert!(parse_expression("a b").is_err());
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_expression("42").unwrap(), Expression::Literal(Value::Int(42)));
        assert_eq!(
            parse_expression("2.5").unwrap(),
            Expression::Literal(Value::Float(2.5))
        );
        let expr = parse_expression("-7").unwrap();
        assert!(matches!(expr, Expression::Unary { op: UnaryOp::Neg, .. }));
    }
}
