mod test_operator_precedence;
