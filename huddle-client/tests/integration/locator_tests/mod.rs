mod test_locate;
