mod azure_test;
